//! Signaling backlog — consumed-on-read delivery of call-control messages.
//!
//! DESIGN
//! ======
//! The backlog is a flat list guarded by one mutex. `send` appends
//! unconditionally. `receive(device)` hands back every live entry addressed
//! to `device` and rewrites the backlog in the same critical section to the
//! entries that are both addressed elsewhere and younger than the retention
//! window. Delivered entries are therefore gone, and stale entries for every
//! other device are pruned as a side effect.
//!
//! Expired entries are never delivered, even to a device that has not
//! polled since they were sent.
//!
//! The backlog lives in memory only. Its retention window is minutes long,
//! so a restart losing it is equivalent to those entries expiring early.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;
use wire::SignalingMessage;

#[derive(Clone)]
pub struct SignalingBacklog {
    inner: Arc<Mutex<Vec<SignalingMessage>>>,
    retention_ms: i64,
}

impl SignalingBacklog {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            retention_ms: i64::try_from(retention.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Append a message to the backlog.
    pub fn send(&self, message: SignalingMessage) {
        debug!(id = %message.id, from = %message.from, to = %message.to, kind = %message.kind, "signaling message queued");
        self.lock().push(message);
    }

    /// Deliver and remove every live message addressed to `device_id`,
    /// pruning expired entries for all devices in the same pass.
    pub fn receive(&self, device_id: &str, now_ms: i64) -> Vec<SignalingMessage> {
        let cutoff = now_ms.saturating_sub(self.retention_ms);
        let mut backlog = self.lock();

        let (addressed, others): (Vec<_>, Vec<_>) = backlog.drain(..).partition(|m| m.to == device_id);
        let before = others.len();
        backlog.extend(others.into_iter().filter(|m| m.timestamp > cutoff));
        let pruned = before - backlog.len();

        let delivered: Vec<_> = addressed.into_iter().filter(|m| m.timestamp > cutoff).collect();
        if !delivered.is_empty() || pruned > 0 {
            debug!(device_id, delivered = delivered.len(), pruned, remaining = backlog.len(), "signaling backlog drained");
        }
        delivered
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SignalingMessage>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "signaling_test.rs"]
mod tests;
