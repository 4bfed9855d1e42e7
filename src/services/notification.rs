//! Notification service — durable, explicitly acknowledged device events.
//!
//! DESIGN
//! ======
//! Notifications are rows addressed by `to_device`. Listing never mutates;
//! the recipient flips `read` (idempotent) or deletes the row. Consumers
//! that must present an event at most once (incoming call prompts) rely on
//! the read flag, not on deletion.

use serde_json::Value;
use sqlx::{Sqlite, SqlitePool};
use tracing::info;
use wire::{Notification, NotificationKind, SendNotificationRequest};

use super::{random_suffix, require};

/// Page size for `list`.
pub const NOTIFICATION_PAGE_SIZE: i64 = 50;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

type NotificationRow = (String, String, String, String, String, Option<String>, Option<String>, bool, i64);

/// Generate a notification id: `notif_{ms}_{7 random chars}`.
#[must_use]
pub fn generate_notification_id(now_ms: i64) -> String {
    format!("notif_{now_ms}_{}", random_suffix(7))
}

/// Validate and store a notification, returning its id.
///
/// # Errors
///
/// Returns `MissingField` if a required field is blank, or a database error.
pub async fn send(pool: &SqlitePool, request: &SendNotificationRequest, now_ms: i64) -> Result<String, RelayError> {
    require(&request.to_device, "toDevice").map_err(RelayError::MissingField)?;
    require(&request.from_device, "fromDevice").map_err(RelayError::MissingField)?;
    require(request.kind.as_str(), "type").map_err(RelayError::MissingField)?;
    require(&request.title, "title").map_err(RelayError::MissingField)?;

    let id = insert(
        pool,
        &request.to_device,
        &request.from_device,
        &request.kind,
        &request.title,
        request.message.as_deref(),
        request.data.as_ref(),
        now_ms,
    )
    .await?;

    info!(kind = %request.kind, from = %request.from_device, to = %request.to_device, "notification sent");
    Ok(id)
}

/// Insert a notification row on any executor (pool or open transaction).
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert<'e, E>(
    executor: E,
    to_device: &str,
    from_device: &str,
    kind: &NotificationKind,
    title: &str,
    message: Option<&str>,
    data: Option<&Value>,
    now_ms: i64,
) -> Result<String, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let id = generate_notification_id(now_ms);
    let data = data.filter(|d| !d.is_null()).map(Value::to_string);
    sqlx::query(
        "INSERT INTO notifications (id, to_device, from_device, type, title, message, data, read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
    )
    .bind(&id)
    .bind(to_device)
    .bind(from_device)
    .bind(kind.as_str())
    .bind(title)
    .bind(message)
    .bind(data)
    .bind(now_ms)
    .execute(executor)
    .await?;
    Ok(id)
}

/// List notifications for a device, newest first, capped at one page.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &SqlitePool, device_id: &str, unread_only: bool) -> Result<Vec<Notification>, RelayError> {
    let sql = if unread_only {
        "SELECT id, to_device, from_device, type, title, message, data, read, created_at
         FROM notifications WHERE to_device = ?1 AND read = 0
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    } else {
        "SELECT id, to_device, from_device, type, title, message, data, read, created_at
         FROM notifications WHERE to_device = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    };

    let rows = sqlx::query_as::<_, NotificationRow>(sql)
        .bind(device_id)
        .bind(NOTIFICATION_PAGE_SIZE)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(row_to_notification).collect())
}

/// Mark a notification read. Unknown ids and repeats are no-ops.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn mark_read(pool: &SqlitePool, notification_id: &str) -> Result<(), RelayError> {
    sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1")
        .bind(notification_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a notification permanently. Unknown ids are no-ops.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete(pool: &SqlitePool, notification_id: &str) -> Result<(), RelayError> {
    sqlx::query("DELETE FROM notifications WHERE id = ?1")
        .bind(notification_id)
        .execute(pool)
        .await?;
    Ok(())
}

fn row_to_notification(row: NotificationRow) -> Notification {
    let (id, to_device, from_device, kind, title, message, data, read, created_at) = row;
    Notification {
        id,
        to_device,
        from_device,
        kind: NotificationKind::from(kind),
        title,
        message,
        // A payload that fails to parse is dropped rather than failing the page.
        data: data.and_then(|raw| serde_json::from_str(&raw).ok()),
        read,
        created_at,
    }
}

#[cfg(test)]
#[path = "notification_test.rs"]
mod tests;
