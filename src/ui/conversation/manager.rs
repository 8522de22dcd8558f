use crate::config::UiConfig;
use crate::conversation::Conversation;
use crate::events::AppEvent;
use crate::interpreter::Acknowledgement;
use crate::lex::BotClient;
use crate::ui::conversation::{
    get_help_text, AcknowledgementDialog, ComposerResult, ConfirmationBanner,
    ConversationComposer, ConversationHistory, SlashCommand,
};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Widget,
    Frame,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Actions that can be requested by the conversation manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationAction {
    None,
    Exit,
}

/// Manages the conversation flow and UI components
pub struct ConversationManager {
    conversation: Conversation,
    composer: ConversationComposer,
    client: Arc<dyn BotClient>,
    bot: String,
    ui: UiConfig,
    events: mpsc::UnboundedSender<AppEvent>,
    pending_acknowledgement: Option<String>,
    status: Option<String>,
}

impl ConversationManager {
    pub fn new(
        client: Arc<dyn BotClient>,
        bot: String,
        ui: UiConfig,
        events: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            conversation: Conversation::new(ui.greeting.clone()),
            composer: ConversationComposer::new("Ask about a hotel or a rental car..."),
            client,
            bot,
            ui,
            events,
            pending_acknowledgement: None,
            status: None,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Handle key input
    pub fn handle_key(&mut self, key: KeyEvent) -> ConversationAction {
        if key.kind != KeyEventKind::Press {
            return ConversationAction::None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return ConversationAction::Exit;
        }

        // The modal swallows everything until dismissed
        if self.pending_acknowledgement.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.pending_acknowledgement = None;
                self.composer.set_focus(true);
            }
            return ConversationAction::None;
        }

        if key.code == KeyCode::Esc {
            return ConversationAction::Exit;
        }

        match self.composer.handle_key(key) {
            ComposerResult::Changed(content) => {
                self.conversation.set_input(content);
                self.status = None;
            }
            ComposerResult::Submitted => self.submit(),
            ComposerResult::Command(SlashCommand::Help) => {
                self.conversation.set_input("");
                self.status = Some(get_help_text());
            }
            ComposerResult::Command(SlashCommand::Bye) => return ConversationAction::Exit,
            ComposerResult::None => {}
        }
        ConversationAction::None
    }

    pub fn handle_paste(&mut self, text: &str) {
        if self.pending_acknowledgement.is_some() {
            return;
        }
        if let ComposerResult::Changed(content) = self.composer.handle_paste(text) {
            self.conversation.set_input(content);
        }
    }

    pub fn handle_app_event(&mut self, event: AppEvent) -> ConversationAction {
        match event {
            AppEvent::BotReplied { turn, result } => {
                let outcome = self.conversation.complete_turn(&turn, result);
                self.composer.set_locked(self.conversation.is_awaiting_reply());
                let Some(outcome) = outcome else {
                    return ConversationAction::None;
                };

                if !outcome.delivered {
                    self.status = Some(
                        "The assistant could not be reached; see the log for details.".to_string(),
                    );
                }
                if let Some(confirmation) = outcome.confirmation {
                    if confirmation.acknowledgement == Acknowledgement::Blocking {
                        self.composer.set_focus(false);
                        self.pending_acknowledgement = Some(confirmation.text);
                    }
                }
            }
        }
        ConversationAction::None
    }

    /// Send the pending input on a background task; the reply comes back
    /// as an [`AppEvent::BotReplied`]
    fn submit(&mut self) {
        let Some(turn) = self.conversation.begin_submit() else {
            if self.conversation.is_awaiting_reply() {
                self.status = Some("Still waiting for the assistant...".to_string());
            }
            return;
        };

        self.composer.clear();
        self.composer.set_locked(true);
        self.status = None;

        let client = Arc::clone(&self.client);
        let bot = self.bot.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = client.send(&bot, &turn.utterance).await;
            if events.send(AppEvent::BotReplied { turn, result }).is_err() {
                tracing::debug!("Conversation closed before the bot replied");
            }
        });
    }

    /// Header, history, composer and status rows
    fn layout(&self, area: Rect) -> std::rc::Rc<[Rect]> {
        let header = ConfirmationBanner {
            title: &self.ui.title,
            confirmation: self.conversation.banner(),
        };
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(header.height(area.width)),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ])
            .split(area)
    }

    /// Render the conversation UI components
    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        let chunks = self.layout(area);

        ConfirmationBanner {
            title: &self.ui.title,
            confirmation: self.conversation.banner(),
        }
        .render(chunks[0], buf);

        ConversationHistory::new(self.conversation.messages(), &self.ui.bot_display_name)
            .awaiting_reply(self.conversation.is_awaiting_reply())
            .render(chunks[1], buf);

        self.composer.render(chunks[2], buf);

        let status = self.status.as_deref().unwrap_or("/help for commands");
        let line = Line::from(Span::styled(status, Style::default().fg(Color::DarkGray)));
        buf.set_line(chunks[3].x, chunks[3].y, &line, chunks[3].width);

        if let Some(text) = self.pending_acknowledgement.as_deref() {
            AcknowledgementDialog { text }.render(area, buf);
        }
    }

    /// Draw into a terminal frame and place the cursor in the composer
    pub fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        self.render(area, frame.buffer_mut());

        if self.pending_acknowledgement.is_none() {
            let composer = self.layout(area)[2];
            let inner_width = composer.width.saturating_sub(2);
            let column = (self.composer.cursor() as u16).min(inner_width.saturating_sub(1));
            frame.set_cursor(composer.x + 1 + column, composer.y + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{PendingTurn, Role, DELIVERY_FAILURE_TEXT};
    use crate::lex::{BotError, BotResponse, DialogState};
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};

    /// Answers every utterance with the same response
    struct FixedBot(fn() -> Result<BotResponse, BotError>);

    impl BotClient for FixedBot {
        fn send<'a>(
            &'a self,
            _bot: &'a str,
            _utterance: &'a str,
        ) -> BoxFuture<'a, Result<BotResponse, BotError>> {
            let reply = (self.0)();
            Box::pin(async move { reply })
        }
    }

    fn car_reserved() -> Result<BotResponse, BotError> {
        Ok(BotResponse {
            message: Some("Your car is booked.".to_string()),
            dialog_state: DialogState::Fulfilled,
            intent_name: Some("BookTripBookCar".to_string()),
            slots: [
                ("BookTripCarType", "convertible"),
                ("BookTripPickUpCity", "Miami"),
                ("BookTripPickUpDate", "2026-11-20"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect(),
        })
    }

    fn unreachable_bot() -> Result<BotResponse, BotError> {
        Err(BotError::Transport("connection refused".to_string()))
    }

    fn manager(
        reply: fn() -> Result<BotResponse, BotError>,
    ) -> (ConversationManager, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ConversationManager::new(
            Arc::new(FixedBot(reply)),
            "BookTripMOBILEHUB".to_string(),
            UiConfig::default(),
            tx,
        );
        (manager, rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_line(manager: &mut ConversationManager, text: &str) {
        for c in text.chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        manager.handle_key(key(KeyCode::Enter));
    }

    fn screen(manager: &ConversationManager) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| manager.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn car_reservation_round_trip_requires_acknowledgement() {
        let (mut manager, mut rx) = manager(car_reserved);

        type_line(&mut manager, "yes");
        assert_eq!(manager.conversation().messages().len(), 2);
        assert!(manager.conversation().is_awaiting_reply());
        assert_eq!(manager.composer.content(), "");

        let event = rx.recv().await.unwrap();
        manager.handle_app_event(event);

        let messages = manager.conversation().messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2].role, Role::Bot);
        assert_eq!(
            manager.pending_acknowledgement.as_deref(),
            Some("Congratulations! Your convertible for pick up in Miami on 2026-11-20 has been reserved!")
        );
        assert!(screen(&manager).contains("Reservation confirmed"));

        // Typing is swallowed until the modal is dismissed
        manager.handle_key(key(KeyCode::Char('x')));
        assert_eq!(manager.conversation().pending_input(), "");
        manager.handle_key(key(KeyCode::Enter));
        assert_eq!(manager.pending_acknowledgement, None);

        let shown = screen(&manager);
        assert!(!shown.contains("Reservation confirmed"));
        assert!(shown.contains("Congratulations!"));
    }

    #[tokio::test]
    async fn second_enter_while_waiting_keeps_the_text() {
        let (mut manager, mut rx) = manager(car_reserved);

        type_line(&mut manager, "first");
        type_line(&mut manager, "second");

        assert_eq!(manager.conversation().messages().len(), 2);
        assert_eq!(manager.composer.content(), "second");
        assert_eq!(manager.conversation().pending_input(), "second");

        let event = rx.recv().await.unwrap();
        manager.handle_app_event(event);
        manager.handle_key(key(KeyCode::Enter));
        manager.handle_key(key(KeyCode::Enter));
        assert_eq!(manager.conversation().messages()[3].text, "second");
    }

    #[tokio::test]
    async fn unreachable_bot_is_reported_in_the_chat() {
        let (mut manager, mut rx) = manager(unreachable_bot);

        type_line(&mut manager, "hello");
        let event = rx.recv().await.unwrap();
        manager.handle_app_event(event);

        let last = manager.conversation().messages().last().unwrap();
        assert_eq!(last.text, DELIVERY_FAILURE_TEXT);
        assert_eq!(manager.pending_acknowledgement, None);
        assert!(!manager.conversation().is_awaiting_reply());
    }

    #[tokio::test]
    async fn reply_for_another_turn_leaves_status_alone() {
        let (mut manager, mut rx) = manager(car_reserved);

        type_line(&mut manager, "yes");
        let event = rx.recv().await.unwrap();
        manager.handle_app_event(event);
        manager.handle_key(key(KeyCode::Enter));

        let stale = AppEvent::BotReplied {
            turn: PendingTurn {
                id: 99,
                utterance: "yes".to_string(),
            },
            result: unreachable_bot(),
        };
        manager.handle_app_event(stale);

        assert_eq!(manager.status, None);
        assert_eq!(manager.conversation().messages().len(), 3);
        assert_ne!(
            manager.conversation().messages()[2].text,
            DELIVERY_FAILURE_TEXT
        );
    }

    #[tokio::test]
    async fn slash_commands_do_not_reach_the_bot() {
        let (mut manager, _rx) = manager(car_reserved);

        type_line(&mut manager, "/help");
        assert_eq!(manager.conversation().messages().len(), 1);
        assert!(manager.status.as_deref().unwrap().contains("/bye"));

        for c in "/bye".chars() {
            manager.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(manager.handle_key(key(KeyCode::Enter)), ConversationAction::Exit);
    }

    #[test]
    fn greeting_and_title_are_rendered() {
        let (manager, _rx) = manager(car_reserved);
        let shown = screen(&manager);

        assert!(shown.contains("Welcome to my travel bot!"));
        assert!(shown.contains("Hello, how can I help you today?"));
    }
}
