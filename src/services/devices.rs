//! Device registry — upsert-by-id directory of kiosks.
//!
//! Registration is idempotent: re-registering an id overwrites its name and
//! refreshes `last_seen`, keeping the original `created_at`. Rename of an
//! unknown id succeeds without creating a row.

use sqlx::SqlitePool;
use tracing::{debug, info};
use wire::Device;

use super::require;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Insert or refresh a device.
///
/// # Errors
///
/// Returns `MissingField` for a blank id or name, or a database error.
pub async fn register(pool: &SqlitePool, device_id: &str, device_name: &str, now_ms: i64) -> Result<(), DeviceError> {
    let device_id = require(device_id, "deviceId").map_err(DeviceError::MissingField)?;
    let device_name = require(device_name, "deviceName").map_err(DeviceError::MissingField)?;

    sqlx::query(
        "INSERT INTO devices (id, name, last_seen, created_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, last_seen = excluded.last_seen",
    )
    .bind(device_id)
    .bind(device_name)
    .bind(now_ms)
    .execute(pool)
    .await?;

    info!(device_id, device_name, "device registered");
    Ok(())
}

/// Rename a known device, returning whether a row matched.
///
/// # Errors
///
/// Returns `MissingField` for a blank name, or a database error.
pub async fn rename(pool: &SqlitePool, device_id: &str, device_name: &str, now_ms: i64) -> Result<bool, DeviceError> {
    let device_name = require(device_name, "deviceName").map_err(DeviceError::MissingField)?;

    let result = sqlx::query("UPDATE devices SET name = ?1, last_seen = ?2 WHERE id = ?3")
        .bind(device_name)
        .bind(now_ms)
        .bind(device_id)
        .execute(pool)
        .await?;

    let matched = result.rows_affected() > 0;
    if matched {
        info!(device_id, device_name, "device renamed");
    } else {
        debug!(device_id, "rename for unknown device ignored");
    }
    Ok(matched)
}

/// All devices, most recently seen first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &SqlitePool) -> Result<Vec<Device>, DeviceError> {
    let rows = sqlx::query_as::<_, (String, String, i64, i64)>(
        "SELECT id, name, last_seen, created_at FROM devices ORDER BY last_seen DESC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, last_seen, created_at)| Device { id, name, last_seen, created_at })
        .collect())
}

#[cfg(test)]
#[path = "devices_test.rs"]
mod tests;
