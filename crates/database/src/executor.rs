//! Executor profile operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Executor, NewExecutor};
use crate::validation::{validate_city, validate_handle, validate_tags};

/// Provision an executor profile. Returns the new id.
///
/// The profile starts active, unlocated and unlinked; it is reconciled to a
/// user on that user's first contact.
pub async fn create_executor(pool: &SqlitePool, executor: &NewExecutor) -> Result<i64> {
    if let Some(handle) = executor.pending_handle.as_deref() {
        validate_handle(handle).map_err(|source| DatabaseError::Invalid {
            entity: "Executor",
            source,
        })?;
    }
    if let Some(city) = executor.city.as_deref() {
        validate_city(city).map_err(|source| DatabaseError::Invalid {
            entity: "Executor",
            source,
        })?;
    }
    validate_tags(&executor.categories).map_err(|source| DatabaseError::Invalid {
        entity: "Executor",
        source,
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO executors
            (user_id, pending_handle, direct_channel_id, categories, city, radius_km, is_owner, is_active)
        VALUES (NULL, ?, ?, ?, ?, ?, ?, 1)
        "#,
    )
    .bind(executor.pending_handle.as_deref())
    .bind(executor.direct_channel_id)
    .bind(executor.categories.join(","))
    .bind(executor.city.as_deref())
    .bind(executor.radius_km)
    .bind(executor.is_owner)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get an executor by ID.
pub async fn get_executor(pool: &SqlitePool, id: i64) -> Result<Executor> {
    sqlx::query_as::<_, Executor>(
        r#"
        SELECT id, user_id, pending_handle, direct_channel_id, categories, city,
               lat, lon, radius_km, is_owner, is_active, created_at
        FROM executors
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::not_found("Executor", id))
}

/// Find the executor profile linked to a user, if any.
pub async fn find_executor_by_user(pool: &SqlitePool, user_id: i64) -> Result<Option<Executor>> {
    let executor = sqlx::query_as::<_, Executor>(
        r#"
        SELECT id, user_id, pending_handle, direct_channel_id, categories, city,
               lat, lon, radius_km, is_owner, is_active, created_at
        FROM executors
        WHERE user_id = ?
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(executor)
}

/// List all executors, newest first.
pub async fn list_executors(pool: &SqlitePool) -> Result<Vec<Executor>> {
    let executors = sqlx::query_as::<_, Executor>(
        r#"
        SELECT id, user_id, pending_handle, direct_channel_id, categories, city,
               lat, lon, radius_km, is_owner, is_active, created_at
        FROM executors
        ORDER BY id DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(executors)
}

/// List executors that take part in matching.
pub async fn list_active_executors(pool: &SqlitePool) -> Result<Vec<Executor>> {
    let executors = sqlx::query_as::<_, Executor>(
        r#"
        SELECT id, user_id, pending_handle, direct_channel_id, categories, city,
               lat, lon, radius_km, is_owner, is_active, created_at
        FROM executors
        WHERE is_active = 1
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(executors)
}

/// Set an executor's home location.
pub async fn set_location(pool: &SqlitePool, id: i64, lat: f64, lon: f64) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE executors
        SET lat = ?, lon = ?
        WHERE id = ?
        "#,
    )
    .bind(lat)
    .bind(lon)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Executor", id));
    }

    Ok(())
}

/// Opt an executor in or out of matching.
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE executors
        SET is_active = ?
        WHERE id = ?
        "#,
    )
    .bind(active)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::not_found("Executor", id));
    }

    Ok(())
}

/// Link profiles provisioned under `handle` to a user and clear the pending handle.
///
/// Handles compare case-insensitively. Returns the number of linked profiles.
pub async fn link_pending_handle(pool: &SqlitePool, user_id: i64, handle: &str) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE executors
        SET user_id = ?, pending_handle = NULL
        WHERE pending_handle IS NOT NULL AND lower(pending_handle) = lower(?)
        "#,
    )
    .bind(user_id)
    .bind(handle.trim_start_matches('@'))
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Link unowned profiles provisioned under a raw channel id to a user.
///
/// Returns the number of linked profiles.
pub async fn link_direct_channel(pool: &SqlitePool, user_id: i64, channel_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE executors
        SET user_id = ?
        WHERE direct_channel_id = ? AND user_id IS NULL
        "#,
    )
    .bind(user_id)
    .bind(channel_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use crate::user;

    fn provisioned(handle: Option<&str>, direct: Option<i64>) -> NewExecutor {
        NewExecutor {
            pending_handle: handle.map(str::to_string),
            direct_channel_id: direct,
            categories: vec!["Экскаватор".to_string(), "Самосвал".to_string()],
            city: Some("Москва".to_string()),
            radius_km: 50.0,
            is_owner: true,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let id = create_executor(db.pool(), &provisioned(Some("digger"), None))
            .await
            .unwrap();

        let e = get_executor(db.pool(), id).await.unwrap();
        assert_eq!(e.categories, "Экскаватор,Самосвал");
        assert_eq!(e.pending_handle.as_deref(), Some("digger"));
        assert!(e.is_active);
        assert!(e.is_owner);
        assert_eq!(e.lat, None);
        assert_eq!(e.user_id, None);
    }

    #[tokio::test]
    async fn test_invalid_profile_rejected() {
        let db = test_db().await;
        let mut bad = provisioned(Some("digger"), None);
        bad.categories.clear();

        assert!(matches!(
            create_executor(db.pool(), &bad).await,
            Err(DatabaseError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_location_and_active() {
        let db = test_db().await;
        let id = create_executor(db.pool(), &provisioned(None, Some(42)))
            .await
            .unwrap();

        set_location(db.pool(), id, 55.7, 37.6).await.unwrap();
        set_active(db.pool(), id, false).await.unwrap();

        let e = get_executor(db.pool(), id).await.unwrap();
        assert_eq!((e.lat, e.lon), (Some(55.7), Some(37.6)));
        assert!(list_active_executors(db.pool()).await.unwrap().is_empty());
        assert_eq!(list_executors(db.pool()).await.unwrap().len(), 1);

        assert!(matches!(
            set_location(db.pool(), 999, 0.0, 0.0).await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_link_by_handle_and_channel() {
        let db = test_db().await;
        let by_handle = create_executor(db.pool(), &provisioned(Some("Digger"), None))
            .await
            .unwrap();
        let by_channel = create_executor(db.pool(), &provisioned(None, Some(555)))
            .await
            .unwrap();

        let u = user::create_user(db.pool(), 555, Some("digger"), None, None)
            .await
            .unwrap();

        assert_eq!(link_pending_handle(db.pool(), u.id, "@digger").await.unwrap(), 1);
        assert_eq!(link_direct_channel(db.pool(), u.id, 555).await.unwrap(), 1);
        // Second pass links nothing new.
        assert_eq!(link_pending_handle(db.pool(), u.id, "digger").await.unwrap(), 0);
        assert_eq!(link_direct_channel(db.pool(), u.id, 555).await.unwrap(), 0);

        let e = get_executor(db.pool(), by_handle).await.unwrap();
        assert_eq!(e.user_id, Some(u.id));
        assert_eq!(e.pending_handle, None);
        assert_eq!(get_executor(db.pool(), by_channel).await.unwrap().user_id, Some(u.id));

        let mine = find_executor_by_user(db.pool(), u.id).await.unwrap().unwrap();
        assert_eq!(mine.id, by_handle);
    }
}
