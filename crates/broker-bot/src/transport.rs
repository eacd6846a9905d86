//! Glue between the Telegram client and the conversation engine.

use async_trait::async_trait;
use broker::{Action, ActionToken, BrokerError, GeoPoint, InboundEvent, MessageSender, Participant};
use telegram_client::{InlineKeyboardButton, InlineKeyboardMarkup, TelegramClient, Update};
use tracing::debug;

/// Telegram-backed message sender for the engine.
#[derive(Clone)]
pub struct TelegramSender {
    client: TelegramClient,
}

impl TelegramSender {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageSender for TelegramSender {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[Action],
    ) -> Result<(), BrokerError> {
        let result = if actions.is_empty() {
            self.client.send_text(chat_id, text).await
        } else {
            self.client
                .send_with_keyboard(chat_id, text, keyboard(actions))
                .await
        };

        result.map_err(|e| {
            if e.is_forbidden() {
                BrokerError::Delivery(format!("chat {} blocked the bot", chat_id))
            } else {
                BrokerError::Delivery(e.to_string())
            }
        })?;
        Ok(())
    }
}

/// One button per row, labels as given, tokens in wire form.
pub fn keyboard(actions: &[Action]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column(
        actions
            .iter()
            .map(|a| InlineKeyboardButton::callback(a.label.clone(), a.token.encode())),
    )
}

/// Check if we should hand this update to the engine.
pub fn should_process(update: &Update) -> Result<(), String> {
    let sender = update.sender().ok_or_else(|| "no sender".to_string())?;
    if sender.is_bot {
        return Err("message from a bot".to_string());
    }

    let chat_kind = update
        .message
        .as_ref()
        .or_else(|| update.callback_query.as_ref().and_then(|q| q.message.as_ref()))
        .map(|m| m.chat.kind.as_str());
    if let Some(kind) = chat_kind {
        if !kind.is_empty() && kind != "private" {
            return Err(format!("{} chat", kind));
        }
    }

    Ok(())
}

/// Convert a Telegram update into an engine event.
pub fn update_to_event(update: &Update) -> Option<InboundEvent> {
    let sender = update.sender()?;
    let channel_id = update.chat_id()?;

    let mut participant = Participant::new(channel_id);
    if let Some(username) = &sender.username {
        participant = participant.with_handle(username.clone());
    }
    if let Some(name) = sender.display_name() {
        participant = participant.with_display_name(name);
    }

    if let Some(query) = &update.callback_query {
        let data = query.data.as_deref()?;
        return match ActionToken::decode(data) {
            Some(token) => Some(InboundEvent::action(participant, token)),
            None => {
                debug!("Unrecognised callback data: {}", data);
                None
            }
        };
    }

    let message = update.message.as_ref()?;
    if let Some(location) = &message.location {
        let point = GeoPoint::new(location.latitude, location.longitude);
        return Some(InboundEvent::location(participant, point));
    }

    message
        .text
        .as_ref()
        .map(|text| InboundEvent::text(participant, text.clone()))
}
