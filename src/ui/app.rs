//! Terminal setup and the chat event loop.

use crate::config::Config;
use crate::events::TuiEvent;
use crate::lex::{BotClient, LexClient};
use crate::ui::conversation::{ConversationAction, ConversationManager};
use anyhow::{Context, Result};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;

type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Open the chat UI against `bot` and run until the user quits
pub async fn run_chat(config: &Config, bot: String) -> Result<()> {
    let client: Arc<dyn BotClient> =
        Arc::new(LexClient::new(config).context("Failed to create bot client")?);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut manager = ConversationManager::new(client, bot.clone(), config.ui.clone(), tx);

    tracing::info!(bot = %bot, "Starting chat session");

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut manager, &mut rx).await;
    restore_terminal(&mut terminal)?;

    tracing::info!(
        messages = manager.conversation().messages().len(),
        "Chat session ended"
    );
    result
}

fn setup_terminal() -> Result<ChatTerminal> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut ChatTerminal) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut ChatTerminal,
    manager: &mut ConversationManager,
    replies: &mut mpsc::UnboundedReceiver<crate::events::AppEvent>,
) -> Result<()> {
    let mut events = EventStream::new();

    loop {
        terminal.draw(|frame| manager.draw(frame))?;

        let action = tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => match TuiEvent::from_crossterm(event) {
                    Some(TuiEvent::Key(key)) => manager.handle_key(key),
                    Some(TuiEvent::Paste(text)) => {
                        manager.handle_paste(&text);
                        ConversationAction::None
                    }
                    Some(TuiEvent::Resize(width, height)) => {
                        tracing::trace!(width, height, "Terminal resized");
                        ConversationAction::None
                    }
                    None => ConversationAction::None,
                },
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => ConversationAction::Exit,
            },
            Some(event) = replies.recv() => manager.handle_app_event(event),
        };

        if action == ConversationAction::Exit {
            return Ok(());
        }
    }
}
