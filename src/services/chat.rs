//! Chat message service.
//!
//! Messages are immutable once stored. Sending a message also drops a
//! `message` notification into the recipient's inbox in the same
//! transaction, so a device never sees the alert without the message.

use sqlx::SqlitePool;
use tracing::info;
use wire::{ChatMessage, NotificationKind};

use super::notification::{self, RelayError};
use super::require;

/// Maximum number of messages returned by `list`.
pub const MESSAGE_PAGE_SIZE: i64 = 1000;

/// Title of the notification created for every chat message.
pub const MESSAGE_NOTIFICATION_TITLE: &str = "New Message";

/// Every stored message, newest first, capped at one page.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &SqlitePool) -> Result<Vec<ChatMessage>, RelayError> {
    let rows = sqlx::query_as::<_, (String, String, String, String, i64)>(
        "SELECT id, from_device, to_device, text, timestamp FROM messages
         ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
    )
    .bind(MESSAGE_PAGE_SIZE)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, from, to, text, timestamp)| ChatMessage { id, from, to, text, timestamp })
        .collect())
}

/// Store a message and notify its recipient.
///
/// # Errors
///
/// Returns `MissingField` for blank id/from/to/text, or a database error
/// (including a duplicate message id).
pub async fn send(pool: &SqlitePool, message: &ChatMessage, now_ms: i64) -> Result<(), RelayError> {
    require(&message.id, "id").map_err(RelayError::MissingField)?;
    require(&message.from, "from").map_err(RelayError::MissingField)?;
    require(&message.to, "to").map_err(RelayError::MissingField)?;
    require(&message.text, "text").map_err(RelayError::MissingField)?;

    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO messages (id, from_device, to_device, text, timestamp, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&message.id)
    .bind(&message.from)
    .bind(&message.to)
    .bind(&message.text)
    .bind(message.timestamp)
    .bind(now_ms)
    .execute(&mut *tx)
    .await?;

    notification::insert(
        &mut *tx,
        &message.to,
        &message.from,
        &NotificationKind::Message,
        MESSAGE_NOTIFICATION_TITLE,
        Some(&message.text),
        None,
        now_ms,
    )
    .await?;
    tx.commit().await?;

    info!(id = %message.id, from = %message.from, to = %message.to, "chat message stored");
    Ok(())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
