//! User CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::User;

/// Create a new user and return the stored row.
pub async fn create_user(
    pool: &SqlitePool,
    channel_id: i64,
    handle: Option<&str>,
    display_name: Option<&str>,
    role: Option<&str>,
) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (channel_id, handle, display_name, role)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(channel_id)
    .bind(handle)
    .bind(display_name)
    .bind(role)
    .execute(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "User",
                    id: channel_id.to_string(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    get_user(pool, result.last_insert_rowid()).await
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, channel_id, handle, display_name, role
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("User", id))
}

/// Find a user by channel id.
pub async fn find_user_by_channel(pool: &SqlitePool, channel_id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, channel_id, handle, display_name, role
        FROM users
        WHERE channel_id = ?
        "#,
    )
    .bind(channel_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Refresh the handle and display name reported by the channel.
pub async fn update_identity(
    pool: &SqlitePool,
    id: i64,
    handle: Option<&str>,
    display_name: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET handle = ?, display_name = ?
        WHERE id = ?
        "#,
    )
    .bind(handle)
    .bind(display_name)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// Set a user's role.
pub async fn set_role(pool: &SqlitePool, id: i64, role: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET role = ?
        WHERE id = ?
        "#,
    )
    .bind(role)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("User", id));
    }

    Ok(())
}

/// List all users.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, channel_id, handle, display_name, role
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}
