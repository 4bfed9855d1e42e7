//! Retention sweeper — opt-in pruning of stale devices, messages and
//! notifications.
//!
//! DESIGN
//! ======
//! Nothing expires by default. When `RETENTION_DAYS` is set, a background
//! task wakes every `RETENTION_SWEEP_SECS` and deletes rows whose server-side
//! timestamp is older than the cutoff: devices by `last_seen`, messages and
//! notifications by `created_at`. The signaling backlog has its own, much
//! shorter expiry and is not touched here.
//!
//! ERROR HANDLING
//! ==============
//! A failed sweep is logged and retried on the next tick.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::state::AppState;

/// Row counts removed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    pub devices: u64,
    pub messages: u64,
    pub notifications: u64,
}

impl PruneReport {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.devices + self.messages + self.notifications
    }
}

/// Delete rows last touched strictly before `cutoff_ms`.
///
/// # Errors
///
/// Returns a database error if any delete fails; the sweep is atomic.
pub async fn prune_expired(pool: &SqlitePool, cutoff_ms: i64) -> Result<PruneReport, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let devices = sqlx::query("DELETE FROM devices WHERE last_seen < ?1")
        .bind(cutoff_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let messages = sqlx::query("DELETE FROM messages WHERE created_at < ?1")
        .bind(cutoff_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    let notifications = sqlx::query("DELETE FROM notifications WHERE created_at < ?1")
        .bind(cutoff_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    Ok(PruneReport { devices, messages, notifications })
}

/// Spawn the sweeper if retention is configured. Returns a handle for shutdown.
#[must_use]
pub fn spawn_retention_sweeper(state: AppState) -> Option<JoinHandle<()>> {
    let retention = state.config.retention?;
    let sweep = state.config.retention_sweep.max(Duration::from_secs(1));
    let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    info!(retention_secs = retention.as_secs(), sweep_secs = sweep.as_secs(), "retention sweeper configured");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let cutoff = state.now_ms().saturating_sub(retention_ms);
            match prune_expired(&state.pool, cutoff).await {
                Ok(report) if report.total() > 0 => info!(
                    devices = report.devices,
                    messages = report.messages,
                    notifications = report.notifications,
                    "retention sweep pruned rows"
                ),
                Ok(_) => {}
                Err(e) => error!(error = %e, "retention sweep failed"),
            }
        }
    }))
}

#[cfg(test)]
#[path = "retention_test.rs"]
mod tests;
