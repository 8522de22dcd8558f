use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interpreter::{self, Confirmation};
use crate::lex::{BotClient, BotError, BotResponse};

/// Bot message appended when a turn could not be delivered
pub const DELIVERY_FAILURE_TEXT: &str = "Sorry, I couldn't reach the assistant.";

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Numeric sender tag used by chat feeds: 0 for the user, 1 for the bot
    #[allow(dead_code)]
    pub fn id(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Bot => 1,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, text: String) -> Self {
        Self {
            role,
            text,
            sent_at: Utc::now(),
        }
    }
}

/// Ticket for a submitted utterance awaiting the bot's reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub id: u64,
    pub utterance: String,
}

/// What completing a turn produced, for the view to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub confirmation: Option<Confirmation>,
    pub delivered: bool,
}

/// Conversation state for one chat session.
///
/// Messages are append-only and always start with the greeting. At most
/// one turn is in flight; a submission made while waiting is refused and
/// the pending input is kept.
#[derive(Debug, Clone)]
pub struct Conversation {
    pending_input: String,
    messages: Vec<Message>,
    banner: Option<String>,
    in_flight: Option<u64>,
    next_turn: u64,
}

impl Conversation {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            pending_input: String::new(),
            messages: vec![Message::new(Role::Bot, greeting.into())],
            banner: None,
            in_flight: None,
            next_turn: 1,
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    #[allow(dead_code)]
    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Latest booking confirmation, if any
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Optimistic half of a submit: record the user's message and clear the
    /// input. Returns `None` when there is nothing to send or a reply is
    /// still outstanding.
    pub fn begin_submit(&mut self) -> Option<PendingTurn> {
        if self.pending_input.trim().is_empty() {
            return None;
        }
        if let Some(turn) = self.in_flight {
            tracing::debug!(turn, "Submission refused while awaiting a reply");
            return None;
        }

        let utterance = std::mem::take(&mut self.pending_input);
        self.messages.push(Message::new(Role::User, utterance.clone()));

        let id = self.next_turn;
        self.next_turn += 1;
        self.in_flight = Some(id);

        Some(PendingTurn { id, utterance })
    }

    /// Apply the bot's reply, or a delivery failure, to a pending turn.
    ///
    /// Returns `None` and changes nothing when `turn` is not the one in
    /// flight.
    pub fn complete_turn(
        &mut self,
        turn: &PendingTurn,
        result: Result<BotResponse, BotError>,
    ) -> Option<TurnOutcome> {
        if self.in_flight != Some(turn.id) {
            tracing::warn!(
                turn = turn.id,
                in_flight = ?self.in_flight,
                "Ignoring reply for a turn that is not pending"
            );
            return None;
        }
        self.in_flight = None;

        match result {
            Ok(response) => {
                self.messages
                    .push(Message::new(Role::Bot, response.reply_text().to_string()));

                let confirmation = interpreter::interpret(&response);
                if let Some(confirmation) = &confirmation {
                    tracing::info!(turn = turn.id, "Booking confirmed");
                    self.banner = Some(confirmation.text.clone());
                }
                Some(TurnOutcome {
                    confirmation,
                    delivered: true,
                })
            }
            Err(err) => {
                tracing::warn!(turn = turn.id, error = %err, "Failed to deliver utterance");
                self.messages
                    .push(Message::new(Role::Bot, DELIVERY_FAILURE_TEXT.to_string()));
                Some(TurnOutcome {
                    confirmation: None,
                    delivered: false,
                })
            }
        }
    }

    /// Send the pending input to `bot` and apply the reply.
    ///
    /// Returns `None` without calling the client when the input is empty
    /// or a reply is still outstanding.
    pub async fn submit<C>(&mut self, client: &C, bot: &str) -> Option<TurnOutcome>
    where
        C: BotClient + ?Sized,
    {
        let turn = self.begin_submit()?;
        let result = client.send(bot, &turn.utterance).await;
        self.complete_turn(&turn, result)
    }
}
