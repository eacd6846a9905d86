//! Configuration for the broker bot.

use std::env;

use crate::admin::StaticAdminList;
use crate::error::BrokerError;
use crate::geocoder::DEFAULT_GEOCODE_URL;

/// Default User-Agent for geocoding requests.
pub const DEFAULT_GEOCODE_UA: &str = "tg-broker-bot/1.0";

/// Service radius given to executors provisioned without one.
pub const DEFAULT_EXECUTOR_RADIUS_KM: f64 = 50.0;

/// Runtime configuration.
#[derive(Clone)]
pub struct BrokerConfig {
    /// Transport credential.
    pub bot_token: String,
    /// Bot API base URL.
    pub telegram_api_url: String,
    /// SQLite URL.
    pub sqlite_url: String,
    /// Participants allowed to run admin commands.
    pub admins: StaticAdminList,
    pub geocode_url: String,
    pub geocode_user_agent: String,
    pub default_executor_radius_km: f64,
}

impl BrokerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `BOT_TOKEN`
    ///
    /// Optional env vars:
    /// - `TELEGRAM_API_URL` (default: https://api.telegram.org)
    /// - `ADMIN_IDS` (comma-separated numeric ids)
    /// - `SQLITE_PATH` (path or sqlite URL, default: ./data/broker.db)
    /// - `GEOCODE_URL` (default: Nominatim search)
    /// - `GEOCODE_UA`
    /// - `DEFAULT_EXECUTOR_RADIUS_KM` (default: 50)
    pub fn from_env() -> Result<Self, BrokerError> {
        let bot_token = env::var("BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| BrokerError::Config("BOT_TOKEN is not set".to_string()))?;

        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string());
        let sqlite_path =
            env::var("SQLITE_PATH").unwrap_or_else(|_| "./data/broker.db".to_string());
        let admins = StaticAdminList::parse(&env::var("ADMIN_IDS").unwrap_or_default());
        let geocode_url =
            env::var("GEOCODE_URL").unwrap_or_else(|_| DEFAULT_GEOCODE_URL.to_string());
        let geocode_user_agent =
            env::var("GEOCODE_UA").unwrap_or_else(|_| DEFAULT_GEOCODE_UA.to_string());

        let default_executor_radius_km = match env::var("DEFAULT_EXECUTOR_RADIUS_KM") {
            Ok(raw) => broker_core::parse_positive_decimal(&raw, "DEFAULT_EXECUTOR_RADIUS_KM")
                .map_err(|e| BrokerError::Config(e.to_string()))?,
            Err(_) => DEFAULT_EXECUTOR_RADIUS_KM,
        };

        Ok(Self {
            bot_token,
            telegram_api_url,
            sqlite_url: sqlite_url_from_path(&sqlite_path),
            admins,
            geocode_url,
            geocode_user_agent,
            default_executor_radius_km,
        })
    }
}

impl std::fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("sqlite_url", &self.sqlite_url)
            .field("admins", &self.admins.len())
            .field("geocode_url", &self.geocode_url)
            .field("default_executor_radius_km", &self.default_executor_radius_km)
            .finish_non_exhaustive()
    }
}

/// Turn a bare path into a SQLite URL that creates the file if missing.
pub fn sqlite_url_from_path(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite:{}?mode=rwc", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_url_from_path() {
        assert_eq!(
            sqlite_url_from_path("./data/broker.db"),
            "sqlite:./data/broker.db?mode=rwc"
        );
        assert_eq!(sqlite_url_from_path("sqlite::memory:"), "sqlite::memory:");
    }
}
