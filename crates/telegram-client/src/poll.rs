//! Long-polling update stream.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, warn};

use crate::error::TelegramError;
use crate::types::Update;
use crate::TelegramClient;

/// Configuration for retrying failed polls.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of consecutive failures (None = infinite).
    pub max_retries: Option<u32>,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier for each retry.
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        delay.min(self.max_delay)
    }

    /// Check if we should retry after the given number of attempts.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_retries.map_or(true, |max| attempts < max)
    }
}

/// A stream of incoming updates.
///
/// Failed polls are yielded as `Err` items after the back-off delay; the
/// stream ends once `max_retries` consecutive polls have failed.
pub type UpdateStream = BoxStream<'static, Result<Update, TelegramError>>;

struct PollState {
    client: TelegramClient,
    reconnect: ReconnectConfig,
    offset: Option<i64>,
    buffer: VecDeque<Update>,
    failures: u32,
}

impl PollState {
    async fn next(mut self) -> Option<(Result<Update, TelegramError>, Self)> {
        loop {
            if let Some(update) = self.buffer.pop_front() {
                return Some((Ok(update), self));
            }

            match self.client.get_updates(self.offset).await {
                Ok(updates) => {
                    if self.failures > 0 {
                        debug!("Polling recovered after {} failures", self.failures);
                    }
                    self.failures = 0;
                    if let Some(last) = updates.last() {
                        self.offset = Some(last.update_id + 1);
                    }
                    self.buffer.extend(updates);
                }
                Err(e) => {
                    if !self.reconnect.should_retry(self.failures) {
                        error!("Giving up polling after {} failures: {}", self.failures, e);
                        return None;
                    }
                    let delay = self.reconnect.delay_for_attempt(self.failures);
                    self.failures += 1;
                    warn!("Poll failed ({}), retrying in {:?}", e, delay);
                    tokio::time::sleep(delay).await;
                    return Some((Err(e), self));
                }
            }
        }
    }
}

/// Create an update stream from a client.
pub fn subscribe(client: &TelegramClient) -> UpdateStream {
    subscribe_with_reconnect(client, ReconnectConfig::default())
}

/// Create an update stream with custom reconnection configuration.
pub fn subscribe_with_reconnect(client: &TelegramClient, reconnect: ReconnectConfig) -> UpdateStream {
    let state = PollState {
        client: client.clone(),
        reconnect,
        offset: None,
        buffer: VecDeque::new(),
        failures: 0,
    };
    stream::unfold(state, PollState::next).boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(config.delay_for_attempt(20), Duration::from_secs(30));
    }

    #[test]
    fn test_should_retry() {
        let unlimited = ReconnectConfig::default();
        assert!(unlimited.should_retry(10_000));

        let limited = ReconnectConfig {
            max_retries: Some(2),
            ..Default::default()
        };
        assert!(limited.should_retry(1));
        assert!(!limited.should_retry(2));
    }

    #[tokio::test]
    async fn test_stream_ends_when_retries_exhausted() {
        // Nothing listens on port 9; every poll fails immediately.
        let config = crate::BotConfig::with_base_url("http://127.0.0.1:9", "t");
        let client = TelegramClient::new(config).unwrap();
        let reconnect = ReconnectConfig {
            max_retries: Some(1),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            backoff_multiplier: 1.0,
        };

        let items: Vec<_> = subscribe_with_reconnect(&client, reconnect).collect().await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
