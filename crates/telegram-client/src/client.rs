//! Bot API HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BotConfig;
use crate::error::TelegramError;
use crate::types::{
    AnswerCallbackParams, ApiResponse, GetUpdatesParams, InlineKeyboardMarkup, Message,
    SendMessageParams, Update, User,
};

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    config: BotConfig,
    me: Option<User>,
}

impl TelegramClient {
    /// Connect to the Bot API and verify the token with `getMe`.
    pub async fn connect(config: BotConfig) -> Result<Self, TelegramError> {
        if config.token.trim().is_empty() {
            return Err(TelegramError::Config("bot token is empty".to_string()));
        }

        let mut client = Self::new(config)?;
        let me = client.get_me().await?;
        info!(
            "Connected to Bot API at {} as @{}",
            client.config.base_url,
            me.username.as_deref().unwrap_or("?")
        );
        client.me = Some(me);

        Ok(client)
    }

    /// Build a client without contacting the API.
    pub fn new(config: BotConfig) -> Result<Self, TelegramError> {
        // Must outlive the long-poll timeout.
        let http = Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 15))
            .build()
            .map_err(TelegramError::Http)?;

        Ok(Self {
            http,
            config,
            me: None,
        })
    }

    /// The bot's own account, if `connect` was used.
    pub fn me(&self) -> Option<&User> {
        self.me.as_ref()
    }

    /// Get the bot's own account.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call::<(), _>("getMe", None).await
    }

    /// Send a message using the full parameter set.
    pub async fn send(&self, params: SendMessageParams) -> Result<Message, TelegramError> {
        self.call("sendMessage", Some(params)).await
    }

    /// Send a plain text message to a chat.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.send(SendMessageParams::text(chat_id, text)).await
    }

    /// Send a text message with an inline keyboard.
    pub async fn send_with_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<Message, TelegramError> {
        self.send(SendMessageParams::text(chat_id, text).with_keyboard(keyboard))
            .await
    }

    /// Acknowledge a callback query so the client stops its spinner.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TelegramError> {
        let params = AnswerCallbackParams {
            callback_query_id: callback_query_id.to_string(),
            text: None,
        };
        let _: bool = self.call("answerCallbackQuery", Some(params)).await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams::new(offset, self.config.poll_timeout_secs);
        self.call("getUpdates", Some(params)).await
    }

    /// Get the configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Make a Bot API call.
    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, TelegramError> {
        let url = self.config.method_url(method);
        debug!("Bot API call: {}", method);

        let mut request = self.http.post(&url);
        if let Some(params) = params {
            request = request.json(&params);
        }

        let response = request.send().await.map_err(|e| e.without_url())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;

        // Error responses carry the same JSON envelope as successes.
        let envelope: ApiResponse<R> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Connection(format!("HTTP {}: {}", status, body)));
            }
            Err(e) => return Err(TelegramError::Json(e)),
        };

        if !envelope.ok {
            return Err(TelegramError::Api {
                code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope.description.unwrap_or_default(),
            });
        }

        envelope.result.ok_or_else(|| TelegramError::Api {
            code: -1,
            description: "No result in response".to_string(),
        })
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("config", &self.config)
            .field("me", &self.me.as_ref().map(|u| u.id))
            .finish()
    }
}
