//! Inbound update types from the Bot API.

use serde::{Deserialize, Serialize};

/// Envelope around every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,

    /// Payload on success.
    pub result: Option<T>,

    /// Human-readable error on failure.
    #[serde(default)]
    pub description: Option<String>,

    /// Error code on failure (mirrors the HTTP status).
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// A single incoming update from `getUpdates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Monotonic update identifier, used as the polling offset.
    pub update_id: i64,

    /// New incoming message.
    #[serde(default)]
    pub message: Option<Message>,

    /// Inline button press.
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// The user who caused this update.
    pub fn sender(&self) -> Option<&User> {
        if let Some(query) = &self.callback_query {
            return Some(&query.from);
        }
        self.message.as_ref().and_then(|m| m.from.as_ref())
    }

    /// The chat a reply to this update should go to.
    pub fn chat_id(&self) -> Option<i64> {
        if let Some(query) = &self.callback_query {
            return query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .or(Some(query.from.id));
        }
        self.message.as_ref().map(|m| m.chat.id)
    }
}

/// A message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier inside the chat.
    pub message_id: i64,

    /// Sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<User>,

    /// Chat the message belongs to.
    pub chat: Chat,

    /// Unix time the message was sent.
    #[serde(default)]
    pub date: i64,

    /// Text content.
    #[serde(default)]
    pub text: Option<String>,

    /// Shared location.
    #[serde(default)]
    pub location: Option<Location>,
}

/// A Telegram user or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,

    #[serde(default)]
    pub is_bot: bool,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: Option<String>,

    /// Public username without the leading `@`.
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// First and last name joined, if any.
    pub fn display_name(&self) -> Option<String> {
        let full = match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        };
        let full = full.trim();
        if full.is_empty() {
            None
        } else {
            Some(full.to_string())
        }
    }
}

/// A chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,

    /// "private", "group", "supergroup" or "channel".
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Identifier to pass to `answerCallbackQuery`.
    pub id: String,

    /// Who pressed the button.
    pub from: User,

    /// Message the button was attached to.
    #[serde(default)]
    pub message: Option<Message>,

    /// The button's callback data.
    #[serde(default)]
    pub data: Option<String>,
}
