//! Request operations. Requests are immutable once written.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{NewRequest, Request};

/// Insert a published request. Returns the new id.
pub async fn create_request(pool: &SqlitePool, request: &NewRequest) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO requests
            (client_user_id, category, description, address_text, lat, lon, radius_km, mode, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'published')
        "#,
    )
    .bind(request.client_user_id)
    .bind(&request.category)
    .bind(&request.description)
    .bind(request.address_text.as_deref())
    .bind(request.lat)
    .bind(request.lon)
    .bind(request.radius_km)
    .bind(&request.mode)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a request by ID.
pub async fn get_request(pool: &SqlitePool, id: i64) -> Result<Request> {
    sqlx::query_as::<_, Request>(
        r#"
        SELECT id, client_user_id, category, description, address_text,
               lat, lon, radius_km, mode, status, created_at
        FROM requests
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Request", id))
}

/// List a client's requests, newest first.
pub async fn list_requests_for_client(pool: &SqlitePool, client_user_id: i64) -> Result<Vec<Request>> {
    let requests = sqlx::query_as::<_, Request>(
        r#"
        SELECT id, client_user_id, category, description, address_text,
               lat, lon, radius_km, mode, status, created_at
        FROM requests
        WHERE client_user_id = ?
        ORDER BY id DESC
        "#,
    )
    .bind(client_user_id)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}
