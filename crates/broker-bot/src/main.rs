//! Equipment broker bot.
//!
//! Long-polls the Telegram Bot API and drives the conversation engine.
//!
//! Run with: cargo run -p broker-bot
//!
//! Configuration via .env file or environment variables:
//!   BOT_TOKEN                   - Bot API token (required)
//!   ADMIN_IDS                   - Comma-separated admin user ids
//!   SQLITE_PATH                 - Database file (default: ./data/broker.db)
//!   TELEGRAM_API_URL            - Bot API base URL
//!   GEOCODE_URL / GEOCODE_UA    - Address lookup endpoint and User-Agent
//!   DEFAULT_EXECUTOR_RADIUS_KM  - Radius for executors added without one

mod transport;
mod workers;

use std::path::Path;
use std::sync::Arc;

use broker::{BrokerConfig, ConversationEngine, NominatimGeocoder};
use database::Database;
use futures::StreamExt;
use telegram_client::{BotConfig, TelegramClient};
use tracing::{debug, info, warn};

use crate::transport::{should_process, update_to_event, TelegramSender};
use crate::workers::{Workers, WORKER_IDLE_TIMEOUT};

/// Create the directory holding a file-backed SQLite database.
fn ensure_sqlite_dir(url: &str) -> std::io::Result<()> {
    let path = url.trim_start_matches("sqlite:").trim_start_matches("//");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    match Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("broker=debug".parse()?)
                .add_directive("broker_bot=debug".parse()?)
                .add_directive("database=info".parse()?)
                .add_directive("telegram_client=info".parse()?),
        )
        .init();

    let config = BrokerConfig::from_env()?;
    info!("Starting broker bot: {:?}", config);
    if config.admins.is_empty() {
        warn!("ADMIN_IDS is empty; admin commands are disabled");
    }

    ensure_sqlite_dir(&config.sqlite_url)?;
    let db = Database::connect(&config.sqlite_url).await?;
    db.migrate().await?;

    let client = TelegramClient::connect(BotConfig::with_base_url(
        config.telegram_api_url.clone(),
        config.bot_token.clone(),
    ))
    .await?;
    if let Some(me) = client.me() {
        info!("Connected as @{}", me.username.as_deref().unwrap_or("?"));
    }

    let geocoder = NominatimGeocoder::new(config.geocode_url.clone(), &config.geocode_user_agent)?;
    let engine = Arc::new(
        ConversationEngine::new(
            db,
            Arc::new(TelegramSender::new(client.clone())),
            Arc::new(geocoder),
            Arc::new(config.admins.clone()),
        )
        .with_default_executor_radius(config.default_executor_radius_km),
    );

    let mut workers = Workers::new(engine, WORKER_IDLE_TIMEOUT);
    let mut stream = telegram_client::subscribe(&client);
    info!("Broker bot is running");

    while let Some(result) = stream.next().await {
        match result {
            Ok(update) => {
                // Stop the button spinner whatever happens next
                if let Some(query) = &update.callback_query {
                    let client = client.clone();
                    let query_id = query.id.clone();
                    tokio::spawn(async move {
                        if let Err(e) = client.answer_callback_query(&query_id).await {
                            debug!("Could not answer callback query: {}", e);
                        }
                    });
                }

                if let Err(reason) = should_process(&update) {
                    debug!("Skipping update {}: {}", update.update_id, reason);
                    continue;
                }

                let event = match update_to_event(&update) {
                    Some(event) => event,
                    None => {
                        debug!("Could not convert update {}", update.update_id);
                        continue;
                    }
                };

                workers.dispatch(event);
            }
            Err(e) => {
                warn!("Stream error: {}", e);
            }
        }
    }

    warn!("Update stream ended");
    Ok(())
}
