//! Client for the conversational bot runtime.
//!
//! [`BotClient`] is the seam the conversation talks through; [`LexClient`]
//! is the HTTP implementation. It posts text turns to the runtime's
//! `PostText` endpoint and decodes the dialog fields the interpreter reads.
//! Bots are registered once through [`Config`] at construction.

use crate::config::{BotConfig, Config};
use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Errors raised while delivering an utterance to the bot runtime
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("bot '{0}' is not registered")]
    UnknownBot(String),

    #[error("bot runtime did not answer within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("bot runtime returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("could not decode bot response: {0}")]
    Deserialization(String),
}

/// Whether the bot considers the current turn complete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DialogState {
    /// Still eliciting an intent, a slot or a confirmation
    InProgress,
    Fulfilled,
    /// Any other runtime state (`ReadyForFulfillment`, `Failed`, ...)
    Other(String),
}

impl From<String> for DialogState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ElicitIntent" | "ConfirmIntent" | "ElicitSlot" | "InProgress" => {
                DialogState::InProgress
            }
            "Fulfilled" => DialogState::Fulfilled,
            _ => DialogState::Other(value),
        }
    }
}

impl From<DialogState> for String {
    fn from(state: DialogState) -> Self {
        match state {
            DialogState::InProgress => "InProgress".to_string(),
            DialogState::Fulfilled => "Fulfilled".to_string(),
            DialogState::Other(value) => value,
        }
    }
}

impl Default for DialogState {
    fn default() -> Self {
        DialogState::Other(String::new())
    }
}

/// Reply to a single text turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dialog_state: DialogState,
    #[serde(default)]
    pub intent_name: Option<String>,
    /// Unfilled slots arrive as `null`, and so does the whole map before
    /// an intent is matched
    #[serde(default, deserialize_with = "null_as_default")]
    pub slots: HashMap<String, Option<String>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl BotResponse {
    /// Text shown in the conversation for this reply
    pub fn reply_text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Value of a filled, non-empty slot
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots
            .get(name)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.is_empty())
    }
}

/// Request/response access to a bot runtime.
///
/// Boxed futures keep the trait object-safe so the UI can hold an
/// `Arc<dyn BotClient>`.
pub trait BotClient: Send + Sync {
    fn send<'a>(
        &'a self,
        bot: &'a str,
        utterance: &'a str,
    ) -> BoxFuture<'a, Result<BotResponse, BotError>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostTextRequest<'a> {
    input_text: &'a str,
    session_attributes: HashMap<String, String>,
}

/// HTTP client for the bot runtime
#[derive(Clone)]
pub struct LexClient {
    client: reqwest::Client,
    bots: HashMap<String, BotConfig>,
    user_id: String,
    timeout: Duration,
}

impl LexClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let timeout = config.request_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            bots: config.bots.clone(),
            user_id: uuid::Uuid::new_v4().to_string(),
            timeout,
        })
    }

    /// Runtime user id for this session
    #[allow(dead_code)]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn post_text_url(&self, bot: &BotConfig) -> Result<reqwest::Url, BotError> {
        let base = bot.runtime_endpoint();
        let mut url = reqwest::Url::parse(&base)
            .map_err(|e| BotError::Transport(format!("invalid endpoint '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| BotError::Transport(format!("endpoint '{}' cannot be a base", base)))?
            .pop_if_empty()
            .extend([
                "bot",
                bot.name.as_str(),
                "alias",
                bot.alias.as_str(),
                "user",
                self.user_id.as_str(),
                "text",
            ]);
        Ok(url)
    }

    async fn post_text(&self, bot: &str, utterance: &str) -> Result<BotResponse, BotError> {
        let registration = self
            .bots
            .get(bot)
            .ok_or_else(|| BotError::UnknownBot(bot.to_string()))?;
        let url = self.post_text_url(registration)?;

        let payload = PostTextRequest {
            input_text: utterance,
            session_attributes: HashMap::new(),
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = registration.access_token() {
            request = request.bearer_auth(token.expose_secret());
        }

        tracing::debug!(
            bot = %bot,
            alias = %registration.alias,
            "Sending utterance to bot runtime"
        );

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        let reply: BotResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::Deserialization(e.to_string()))?;

        tracing::debug!(
            bot = %bot,
            dialog_state = ?reply.dialog_state,
            intent = reply.intent_name.as_deref().unwrap_or("-"),
            "Received bot response"
        );
        Ok(reply)
    }

    fn classify(&self, error: reqwest::Error) -> BotError {
        if error.is_timeout() {
            BotError::Timeout(self.timeout)
        } else {
            BotError::Transport(error.to_string())
        }
    }
}

impl BotClient for LexClient {
    fn send<'a>(
        &'a self,
        bot: &'a str,
        utterance: &'a str,
    ) -> BoxFuture<'a, Result<BotResponse, BotError>> {
        Box::pin(self.post_text(bot, utterance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Role};
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, timeout_secs: u64) -> Config {
        let mut config = Config::default();
        config.request_timeout_secs = timeout_secs;
        let bot = config.bots.get_mut(crate::config::DEFAULT_BOT).unwrap();
        bot.endpoint = Some(server.uri());
        bot.access_token_env = None;
        bot.access_token = Some(secrecy::SecretString::from("test-token"));
        config
    }

    #[test]
    fn dialog_state_maps_runtime_values() {
        assert_eq!(DialogState::from("ElicitSlot".to_string()), DialogState::InProgress);
        assert_eq!(DialogState::from("Fulfilled".to_string()), DialogState::Fulfilled);
        assert_eq!(
            DialogState::from("ReadyForFulfillment".to_string()),
            DialogState::Other("ReadyForFulfillment".to_string())
        );
    }

    #[test]
    fn null_and_empty_slots_are_unfilled() {
        let response: BotResponse = serde_json::from_value(serde_json::json!({
            "message": "Where to?",
            "dialogState": "ElicitSlot",
            "intentName": "BookTripBookHotel",
            "slots": {
                "BookTripLocation": null,
                "BookTripNights": "",
                "BookTripRoomType": "king"
            }
        }))
        .unwrap();

        assert_eq!(response.dialog_state, DialogState::InProgress);
        assert_eq!(response.slot("BookTripLocation"), None);
        assert_eq!(response.slot("BookTripNights"), None);
        assert_eq!(response.slot("BookTripRoomType"), Some("king"));
        assert_eq!(response.slot("BookTripCheckInDate"), None);
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let response: BotResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.reply_text(), "");
        assert!(response.intent_name.is_none());
        assert!(response.slots.is_empty());
    }

    #[test]
    fn null_fields_before_intent_match_decode_to_defaults() {
        let response: BotResponse = serde_json::from_str(
            r#"{"message":"Sorry, can you please repeat that?","dialogState":"ElicitIntent","intentName":null,"slots":null}"#,
        )
        .unwrap();
        assert_eq!(response.reply_text(), "Sorry, can you please repeat that?");
        assert_eq!(response.dialog_state, DialogState::InProgress);
        assert!(response.intent_name.is_none());
        assert!(response.slots.is_empty());

        let response: BotResponse =
            serde_json::from_str(r#"{"message":"Hi","dialogState":null,"slots":null}"#).unwrap();
        assert_eq!(response.dialog_state, DialogState::default());
    }

    #[tokio::test]
    async fn unmatched_intent_reply_reaches_the_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Sorry, can you please repeat that?",
                "dialogState": "ElicitIntent",
                "intentName": null,
                "slots": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LexClient::new(&config_for(&server, 5)).unwrap();
        let mut conversation = Conversation::new("Hello");
        conversation.set_input("hello");

        let outcome = conversation
            .submit(&client, "BookTripMOBILEHUB")
            .await
            .unwrap();

        assert!(outcome.delivered);
        assert_eq!(outcome.confirmation, None);
        let last = conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::Bot);
        assert_eq!(last.text, "Sorry, can you please repeat that?");
    }

    #[tokio::test]
    async fn posts_text_and_decodes_reply() {
        let server = MockServer::start().await;
        let config = config_for(&server, 5);
        let client = LexClient::new(&config).unwrap();

        Mock::given(method("POST"))
            .and(path(format!(
                "/bot/BookTripMOBILEHUB/alias/$LATEST/user/{}/text",
                client.user_id()
            )))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "inputText": "book a hotel",
                "sessionAttributes": {}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "What city will you be staying in?",
                "dialogState": "ElicitSlot",
                "intentName": "BookTripBookHotel",
                "slots": { "BookTripLocation": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client
            .send("BookTripMOBILEHUB", "book a hotel")
            .await
            .unwrap();

        assert_eq!(reply.reply_text(), "What city will you be staying in?");
        assert_eq!(reply.dialog_state, DialogState::InProgress);
        assert_eq!(reply.intent_name.as_deref(), Some("BookTripBookHotel"));
    }

    #[tokio::test]
    async fn server_error_is_reported_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("throttled"))
            .mount(&server)
            .await;

        let client = LexClient::new(&config_for(&server, 5)).unwrap();
        let err = client.send("BookTripMOBILEHUB", "hi").await.unwrap_err();

        match err {
            BotError::Service { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "throttled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_runtime_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "message": "late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = LexClient::new(&config_for(&server, 1)).unwrap();
        let err = client.send("BookTripMOBILEHUB", "hi").await.unwrap_err();

        assert!(matches!(err, BotError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = LexClient::new(&config_for(&server, 5)).unwrap();
        let err = client.send("BookTripMOBILEHUB", "hi").await.unwrap_err();

        assert!(matches!(err, BotError::Deserialization(_)));
    }

    #[tokio::test]
    async fn unknown_bot_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = LexClient::new(&config_for(&server, 5)).unwrap();
        let err = client.send("OrderFlowers", "hi").await.unwrap_err();

        assert!(matches!(err, BotError::UnknownBot(name) if name == "OrderFlowers"));
    }
}
