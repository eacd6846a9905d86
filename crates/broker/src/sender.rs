//! Message sender trait and implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::action::Action;
use crate::error::BrokerError;

/// Trait for delivering a message with buttons to a chat.
///
/// Abstracted to support different transports (Telegram, tests, etc.)
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message.
    ///
    /// # Arguments
    /// * `chat_id` - Channel address of the recipient
    /// * `text` - Message content
    /// * `actions` - Buttons rendered under the message, one per row
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<(), BrokerError>;
}

/// A no-op message sender for testing that discards all messages.
#[derive(Debug, Clone, Default)]
pub struct NoOpSender;

#[async_trait]
impl MessageSender for NoOpSender {
    async fn send_message(
        &self,
        _chat_id: i64,
        _text: &str,
        _actions: &[Action],
    ) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// A logging message sender for debugging that logs all operations.
#[derive(Debug, Clone, Default)]
pub struct LoggingSender;

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<(), BrokerError> {
        let tokens: Vec<String> = actions.iter().map(|a| a.token.encode()).collect();
        tracing::info!("Sending message to {} {:?}: {}", chat_id, tokens, text);
        Ok(())
    }
}

/// A message captured by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub actions: Vec<Action>,
}

/// Records every delivered message; can be told to fail for given chats.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<i64>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later delivery to `chat_id` fail.
    pub async fn fail_for(&self, chat_id: i64) {
        self.failing.lock().await.insert(chat_id);
    }

    /// All delivered messages, oldest first.
    pub async fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Delivered messages for one chat, oldest first.
    pub async fn messages_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }

    /// Last message delivered to a chat.
    pub async fn last_to(&self, chat_id: i64) -> Option<SentMessage> {
        self.messages_to(chat_id).await.pop()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<(), BrokerError> {
        if self.failing.lock().await.contains(&chat_id) {
            return Err(BrokerError::Delivery(format!("chat {} unreachable", chat_id)));
        }

        self.sent.lock().await.push(SentMessage {
            chat_id,
            text: text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }
}

#[async_trait]
impl<T: MessageSender + ?Sized> MessageSender for std::sync::Arc<T> {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<(), BrokerError> {
        (**self).send_message(chat_id, text, actions).await
    }
}
