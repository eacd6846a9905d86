//! Telegram Bot API client library.
//!
//! This crate provides a Rust client for talking to the Telegram Bot API
//! over HTTP. It supports:
//!
//! - Sending text messages with inline keyboards
//! - Acknowledging callback queries from inline buttons
//! - Receiving updates via long polling, with back-off on failures
//!
//! # Example
//!
//! ```no_run
//! use telegram_client::{BotConfig, TelegramClient};
//!
//! # async fn example() -> Result<(), telegram_client::TelegramError> {
//! let config = BotConfig::new("123456:ABC-DEF");
//! let client = TelegramClient::connect(config).await?;
//!
//! client.send_text(42, "Hello!").await?;
//!
//! use futures::StreamExt;
//! let mut updates = telegram_client::subscribe(&client);
//! while let Some(result) = updates.next().await {
//!     match result {
//!         Ok(update) => {
//!             if let Some(text) = update.message.as_ref().and_then(|m| m.text.as_deref()) {
//!                 println!("{}: {}", update.update_id, text);
//!             }
//!         }
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poll;
pub mod types;

pub use client::TelegramClient;
pub use config::BotConfig;
pub use error::TelegramError;
pub use poll::{subscribe, subscribe_with_reconnect, ReconnectConfig, UpdateStream};
pub use types::*;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
