use crate::conversation::PendingTurn;
use crate::lex::{BotError, BotResponse};

/// Internal application events for coordinating between components
#[derive(Debug)]
pub enum AppEvent {
    /// The bot runtime answered (or failed to answer) a pending turn
    BotReplied {
        turn: PendingTurn,
        result: Result<BotResponse, BotError>,
    },
}

/// TUI-specific events (keyboard, paste, resize)
#[derive(Debug, Clone)]
pub enum TuiEvent {
    Key(crossterm::event::KeyEvent),
    Paste(String),
    Resize(u16, u16),
}

impl TuiEvent {
    /// Map a raw terminal event, dropping the ones the chat ignores
    pub fn from_crossterm(event: crossterm::event::Event) -> Option<Self> {
        match event {
            crossterm::event::Event::Key(key) => Some(TuiEvent::Key(key)),
            crossterm::event::Event::Paste(text) => Some(TuiEvent::Paste(text)),
            crossterm::event::Event::Resize(w, h) => Some(TuiEvent::Resize(w, h)),
            _ => None,
        }
    }
}
