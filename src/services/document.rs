//! Shared state document service — singleton fetch and stamped replace.
//!
//! DESIGN
//! ======
//! Exactly one document lives in `app_state` (row id 1). A push replaces it
//! whole; there is no merge and no history. The server is the only writer of
//! `lastModified`/`modifiedBy`: anything the device sent under those keys is
//! dropped before stamping.
//!
//! Pushes are serialized through `AppState::state_write_lock` so the
//! read-previous-stamp / upsert pair cannot interleave. Inside the lock the
//! stamp is `max(now, previous + 1)`, which keeps `lastModified` strictly
//! increasing across same-millisecond writes and wall-clock steps backward.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures surface as `StateError` and become HTTP 500 at the
//! route layer. Nothing is retried here.

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{debug, info};
use wire::SharedStateDocument;

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Read the current document, or `None` if nothing was ever pushed.
///
/// # Errors
///
/// Returns a database error if the query fails, or `Corrupt` if the stored
/// blob does not parse.
pub async fn fetch_document(pool: &SqlitePool) -> Result<Option<SharedStateDocument>, StateError> {
    let row = sqlx::query_as::<_, (String,)>("SELECT data FROM app_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    match row {
        Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// Stamp and store a pushed document, returning the assigned `lastModified`.
///
/// # Errors
///
/// Returns a database error if the read or upsert fails.
pub async fn push_document(
    state: &AppState,
    content: Map<String, Value>,
    origin_device: &str,
) -> Result<i64, StateError> {
    let document = SharedStateDocument::from_content(content);

    let _guard = state.state_write_lock.lock().await;

    let previous = sqlx::query_scalar::<_, i64>("SELECT last_modified FROM app_state WHERE id = 1")
        .fetch_optional(&state.pool)
        .await?;
    let now = state.now_ms();
    let stamp = next_stamp(previous, now);
    if stamp != now {
        debug!(now, stamp, "clock did not advance past previous write; bumping stamp");
    }

    let data = serde_json::to_string(&document.stamped(stamp, origin_device))?;
    sqlx::query(
        "INSERT INTO app_state (id, data, last_modified, modified_by, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            last_modified = excluded.last_modified,
            modified_by = excluded.modified_by,
            updated_at = excluded.updated_at",
    )
    .bind(&data)
    .bind(stamp)
    .bind(origin_device)
    .bind(now)
    .execute(&state.pool)
    .await?;

    info!(device_id = %origin_device, last_modified = stamp, bytes = data.len(), "state document saved");
    Ok(stamp)
}

/// Strictly increasing write stamp.
pub(crate) fn next_stamp(previous: Option<i64>, now: i64) -> i64 {
    match previous {
        Some(prev) if now <= prev => prev + 1,
        _ => now,
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
