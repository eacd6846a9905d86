//! SQLite persistence layer for the broker bot.
//!
//! This crate provides async storage for users, executor profiles, requests,
//! offers, deals and global settings using SQLx with SQLite. Every write is a
//! single statement; callers compose multi-step sequences themselves.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, request, models::NewRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:broker.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let id = request::create_request(db.pool(), &NewRequest {
//!         client_user_id: 1,
//!         category: "Экскаватор".to_string(),
//!         description: "Dig a pit".to_string(),
//!         address_text: Some("Moscow".to_string()),
//!         lat: 55.75,
//!         lon: 37.62,
//!         radius_km: 50.0,
//!         mode: "auction".to_string(),
//!     })
//!     .await?;
//!     println!("request #{}", id);
//!
//!     Ok(())
//! }
//! ```

pub mod deal;
pub mod error;
pub mod executor;
pub mod models;
pub mod offer;
pub mod request;
pub mod settings;
pub mod user;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{
    Deal, Executor, NewExecutor, NewOffer, NewRequest, Offer, Request, User,
};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Each inbound event touches the store a handful of times; 20 covers bursts.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// Safe on every startup against a live store: migrations only ever add
    /// tables and nullable columns.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::test_db;

    #[tokio::test]
    async fn test_migrations_are_repeatable() {
        let db = test_db().await;
        // A second run against the same store is a no-op.
        db.migrate().await.unwrap();

        assert!(settings::prefer_owner_first(db.pool()).await.unwrap());
    }

    #[tokio::test]
    async fn test_additive_columns_default_to_null() {
        let db = test_db().await;

        sqlx::query(
            r#"
            INSERT INTO requests (client_user_id, category, description, lat, lon, radius_km)
            VALUES (1, 'Экскаватор', 'legacy row', 55.0, 37.0, 10.0)
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let rows = request::list_requests_for_client(db.pool(), 1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address_text, None);
        assert_eq!(rows[0].mode, None);
        assert_eq!(rows[0].status, "published");
    }
}
