//! Deal operations. A deal is written once and never changed.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Deal;

/// Insert a deal for an accepted offer with contacts already released.
///
/// Creation and release are one statement, so a deal row always implies
/// releasable contacts. Returns the new id.
pub async fn create_deal(pool: &SqlitePool, request_id: i64, offer_id: i64) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO deals (request_id, offer_id, contacts_released)
        VALUES (?, ?, 1)
        "#,
    )
    .bind(request_id)
    .bind(offer_id)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a deal by ID.
pub async fn get_deal(pool: &SqlitePool, id: i64) -> Result<Deal> {
    sqlx::query_as::<_, Deal>(
        r#"
        SELECT id, request_id, offer_id, contacts_released, created_at
        FROM deals
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Deal", id))
}

/// List deals created from an offer, oldest first.
pub async fn list_deals_for_offer(pool: &SqlitePool, offer_id: i64) -> Result<Vec<Deal>> {
    let deals = sqlx::query_as::<_, Deal>(
        r#"
        SELECT id, request_id, offer_id, contacts_released, created_at
        FROM deals
        WHERE offer_id = ?
        ORDER BY id
        "#,
    )
    .bind(offer_id)
    .fetch_all(pool)
    .await?;

    Ok(deals)
}

/// Count every deal in the store.
pub async fn count_deals(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM deals
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}
