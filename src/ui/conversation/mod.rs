//! Conversation UI components for the chat interface

pub mod banner;
pub mod commands;
pub mod composer;
pub mod history;
pub mod manager;

pub use banner::{AcknowledgementDialog, ConfirmationBanner};
pub use commands::{get_help_text, SlashCommand};
pub use composer::{ComposerResult, ConversationComposer};
pub use history::ConversationHistory;
pub use manager::{ConversationAction, ConversationManager};
