//! Global settings (single row).

use sqlx::SqlitePool;

use crate::Result;

/// Whether owner-fleet executors rank ahead of subcontractors.
///
/// Defaults to `true` if the settings row is missing.
pub async fn prefer_owner_first(pool: &SqlitePool) -> Result<bool> {
    let value = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT prefer_owner_first FROM settings WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(value.unwrap_or(true))
}

/// Set the owner-fleet ranking preference.
pub async fn set_prefer_owner_first(pool: &SqlitePool, value: bool) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (id, prefer_owner_first)
        VALUES (1, ?)
        ON CONFLICT(id) DO UPDATE SET
            prefer_owner_first = excluded.prefer_owner_first
        "#,
    )
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
