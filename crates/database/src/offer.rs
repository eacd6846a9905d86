//! Offer operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewOffer, Offer};

/// Insert an active offer. Returns the new id.
///
/// Neither the request nor the executor has to exist.
pub async fn create_offer(pool: &SqlitePool, offer: &NewOffer) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO offers (request_id, executor_id, rate_type, rate_value, comment, status)
        VALUES (?, ?, ?, ?, ?, 'active')
        "#,
    )
    .bind(offer.request_id)
    .bind(offer.executor_id)
    .bind(&offer.rate_type)
    .bind(offer.rate_value)
    .bind(&offer.comment)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get an offer by ID.
pub async fn get_offer(pool: &SqlitePool, id: i64) -> Result<Offer> {
    sqlx::query_as::<_, Offer>(
        r#"
        SELECT id, request_id, executor_id, rate_type, rate_value, comment, status, created_at
        FROM offers
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Offer", id))
}

/// List the offers made on a request, oldest first.
pub async fn list_offers_for_request(pool: &SqlitePool, request_id: i64) -> Result<Vec<Offer>> {
    let offers = sqlx::query_as::<_, Offer>(
        r#"
        SELECT id, request_id, executor_id, rate_type, rate_value, comment, status, created_at
        FROM offers
        WHERE request_id = ?
        ORDER BY id
        "#,
    )
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    Ok(offers)
}

/// Count the offers made on a request.
pub async fn count_offers_for_request(pool: &SqlitePool, request_id: i64) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM offers WHERE request_id = ?
        "#,
    )
    .bind(request_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Overwrite an offer's status.
///
/// Transition rules are the caller's concern; this is a single write.
pub async fn set_status(pool: &SqlitePool, id: i64, status: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE offers
        SET status = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Offer", id));
    }

    Ok(())
}
