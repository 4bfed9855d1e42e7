//! Device-side state sync.
//!
//! DESIGN
//! ======
//! The engine keeps this device's copy of the shared document converged with
//! the server by whole-document last-writer-wins:
//!
//! - a 3 s poll fetches the server copy and adopts it only when it is newer
//!   than the last generation this device saw AND was written by another
//!   device. A device's own write echoing back never reverts its local edits.
//! - local edits go through [`SyncEngine::update`], which schedules one push
//!   after a 500 ms quiet period. Each new edit replaces the pending push.
//! - at most one poll is in flight. A tick that finds the busy flag set does
//!   nothing; the flag is released by a drop guard on every exit path.
//! - while offline, each tick re-probes the server instead of fetching. The
//!   first successful probe reloads the server document exactly as startup
//!   does, so edits made offline are replaced by the server copy.
//!
//! Device-local fields (acting user, role-change prompt, layout-edit role)
//! live in [`DeviceSession`] and never enter the synchronized document.
//!
//! ERROR HANDLING
//! ==============
//! Fetch and push failures are logged and the loop carries on at the next
//! tick. There is no back-off.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wire::SharedStateDocument;

use crate::identity::DeviceIdentity;
use crate::source::{DataSource, HEALTH_TIMEOUT, SourceError};

/// Cadences of the device loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncTimings {
    pub poll_interval: Duration,
    pub debounce: Duration,
    pub notification_poll: Duration,
    pub health_timeout: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            debounce: Duration::from_millis(500),
            notification_poll: Duration::from_secs(2),
            health_timeout: HEALTH_TIMEOUT,
        }
    }
}

/// Per-device fields that are never synchronized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceSession {
    pub current_user: Option<Value>,
    pub pending_role_change: Option<String>,
    pub editing_layout_for_role: Option<String>,
}

/// Result of one poll tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// A previous poll is still in flight.
    Skipped,
    /// The device is offline; nothing was fetched.
    Offline,
    /// The device came back online and reloaded the server document.
    Reconnected,
    /// The remote document replaced local state.
    Accepted,
    /// The remote document is not newer than the last one seen.
    Stale,
    /// The remote document was written by this device.
    Echo,
    /// No document exists yet.
    Empty,
    /// The fetch failed.
    Failed,
}

/// How startup resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bootstrap {
    /// Health probe failed: running on the default document until a later
    /// poll tick reconnects.
    Offline,
    /// Adopted the server's existing document.
    Adopted,
    /// No document existed: pushed the default one.
    Seeded,
    /// Server reachable but the fetch failed: default document, sync on.
    Degraded,
}

/// Accept a fetched document only if it is newer than the last generation
/// seen and was not written by this device.
#[must_use]
pub fn should_accept(remote: &SharedStateDocument, last_synced: i64, device_id: &str) -> bool {
    remote.last_modified_or_zero() > last_synced && remote.modified_by.as_deref() != Some(device_id)
}

fn classify(remote: &SharedStateDocument, last_synced: i64, device_id: &str) -> PollOutcome {
    if remote.modified_by.as_deref() == Some(device_id) {
        PollOutcome::Echo
    } else if should_accept(remote, last_synced, device_id) {
        PollOutcome::Accepted
    } else {
        PollOutcome::Stale
    }
}

/// Document a device synthesizes when the server has none.
#[must_use]
pub fn default_document() -> Map<String, Value> {
    let document = json!({
        "users": {
            "shop_floor": { "id": "shop_floor", "name": "Shop Floor", "role": "shop_floor" },
            "manager": { "id": "manager", "name": "Manager", "role": "manager", "passcode": "1234" },
            "administrator": { "id": "administrator", "name": "Administrator", "role": "administrator", "passcode": "0000" }
        },
        "layouts": {
            "shop_floor": [],
            "manager": [],
            "administrator": []
        },
        "announcements": [],
        "notices": [],
        "apps": [],
        "trainingCatalog": []
    });
    match document {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn shop_floor_user(document: &Map<String, Value>) -> Option<Value> {
    document.get("users").and_then(|users| users.get("shop_floor")).cloned()
}

/// Holds the busy flag for as long as it lives.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct LocalState {
    document: Map<String, Value>,
    session: DeviceSession,
    last_synced: i64,
}

struct PendingPush {
    generation: u64,
    handle: JoinHandle<()>,
}

struct EngineInner {
    source: Arc<dyn DataSource>,
    device_id: String,
    timings: SyncTimings,
    busy: AtomicBool,
    connected: AtomicBool,
    local: Mutex<LocalState>,
    pending: Mutex<Option<PendingPush>>,
    generation: AtomicU64,
}

/// Handle to one device's sync engine. Clones share the engine.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, identity: &DeviceIdentity, timings: SyncTimings) -> Self {
        let document = default_document();
        let session = DeviceSession { current_user: shop_floor_user(&document), ..DeviceSession::default() };
        Self {
            inner: Arc::new(EngineInner {
                source,
                device_id: identity.device_id.clone(),
                timings,
                busy: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                local: Mutex::new(LocalState { document, session, last_synced: 0 }),
                pending: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_synced(&self) -> i64 {
        self.local().last_synced
    }

    /// Snapshot of the synchronized document.
    #[must_use]
    pub fn document(&self) -> Map<String, Value> {
        self.local().document.clone()
    }

    #[must_use]
    pub fn session(&self) -> DeviceSession {
        self.local().session.clone()
    }

    /// Edit device-local session fields. Never pushed.
    pub fn update_session<F>(&self, f: F)
    where
        F: FnOnce(&mut DeviceSession),
    {
        f(&mut self.local().session);
    }

    /// Whether a debounced push is waiting to fire.
    #[must_use]
    pub fn has_pending_push(&self) -> bool {
        self.pending().is_some()
    }

    fn local(&self) -> std::sync::MutexGuard<'_, LocalState> {
        self.inner.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Option<PendingPush>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Probe the server and load or seed the shared document.
    pub async fn bootstrap(&self) -> Bootstrap {
        if !self.inner.source.health().await {
            warn!(device_id = %self.inner.device_id, "server unreachable; running offline on default document");
            self.inner.connected.store(false, Ordering::Release);
            self.reset_to_default();
            return Bootstrap::Offline;
        }
        self.inner.connected.store(true, Ordering::Release);
        self.load_remote().await
    }

    /// Adopt the server document, or seed the server when it has none.
    async fn load_remote(&self) -> Bootstrap {
        match self.inner.source.fetch_state().await {
            Ok(Some(remote)) => {
                let last_modified = remote.last_modified_or_zero();
                let mut local = self.local();
                local.session = DeviceSession { current_user: shop_floor_user(&remote.content), ..DeviceSession::default() };
                local.document = remote.content;
                local.last_synced = last_modified;
                info!(last_modified, modified_by = ?remote.modified_by, "adopted server document");
                Bootstrap::Adopted
            }
            Ok(None) => {
                self.reset_to_default();
                let content = self.document();
                match self.inner.source.push_state(&content).await {
                    Ok(response) => {
                        if let Some(stamp) = response.last_modified.filter(|_| response.success) {
                            self.local().last_synced = stamp;
                        }
                        info!(last_modified = ?response.last_modified, "seeded server with default document");
                    }
                    Err(e) => warn!(error = %e, "failed to seed default document"),
                }
                Bootstrap::Seeded
            }
            Err(e) => {
                warn!(error = %e, "initial state fetch failed; using default document");
                self.reset_to_default();
                Bootstrap::Degraded
            }
        }
    }

    fn reset_to_default(&self) {
        let document = default_document();
        let mut local = self.local();
        local.session = DeviceSession { current_user: shop_floor_user(&document), ..DeviceSession::default() };
        local.document = document;
    }

    /// Re-probe the server and update the connection flag. Coming back
    /// online reloads the server document the same way [`Self::bootstrap`]
    /// does.
    pub async fn reconnect(&self) -> bool {
        let connected = self.inner.source.health().await;
        let was = self.inner.connected.swap(connected, Ordering::AcqRel);
        if connected != was {
            info!(connected, "connection status changed");
        }
        if connected && !was {
            let reload = self.load_remote().await;
            info!(?reload, last_synced = self.last_synced(), "reloaded server document after reconnect");
        }
        connected
    }

    // =========================================================================
    // POLLING
    // =========================================================================

    /// Run one poll: fetch, decide, maybe replace local state.
    pub async fn poll_once(&self) -> PollOutcome {
        let Some(_busy) = BusyGuard::try_acquire(&self.inner.busy) else {
            debug!("skipping sync tick; previous poll in flight");
            return PollOutcome::Skipped;
        };
        if !self.is_connected() {
            return if self.reconnect().await { PollOutcome::Reconnected } else { PollOutcome::Offline };
        }

        let remote = match self.inner.source.fetch_state().await {
            Ok(Some(remote)) => remote,
            Ok(None) => return PollOutcome::Empty,
            Err(e) => {
                warn!(error = %e, "state poll failed");
                return PollOutcome::Failed;
            }
        };

        let mut local = self.local();
        let outcome = classify(&remote, local.last_synced, &self.inner.device_id);
        debug!(
            remote = remote.last_modified_or_zero(),
            local = local.last_synced,
            modified_by = ?remote.modified_by,
            ?outcome,
            "sync check"
        );
        if outcome == PollOutcome::Accepted {
            local.last_synced = remote.last_modified_or_zero();
            if local.session.current_user.is_none() {
                local.session.current_user = shop_floor_user(&remote.content);
            }
            local.document = remote.content;
            info!(last_synced = local.last_synced, modified_by = ?remote.modified_by, "applied remote state");
        }
        outcome
    }

    /// Spawn the fixed-cadence poll loop. Each tick runs in its own task so a
    /// slow fetch turns later ticks into [`PollOutcome::Skipped`].
    #[must_use]
    pub fn spawn_polling(&self) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.inner.timings.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.poll_once().await;
                });
            }
        })
    }

    // =========================================================================
    // PUSH
    // =========================================================================

    /// Mutate the synchronized document and schedule a debounced push.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        {
            let mut local = self.local();
            f(&mut local.document);
            wire::strip_metadata(&mut local.document);
        }
        self.schedule_push();
    }

    /// Replace any pending push with one firing after the quiet period.
    fn schedule_push(&self) {
        if !self.is_connected() {
            return;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let engine = self.clone();
        let debounce = self.inner.timings.debounce;

        let mut pending = self.pending();
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if engine.claim_pending(generation) {
                if let Err(e) = engine.push_now().await {
                    warn!(error = %e, "failed to save state");
                }
            }
        });
        *pending = Some(PendingPush { generation, handle });
    }

    fn claim_pending(&self, generation: u64) -> bool {
        let mut pending = self.pending();
        if pending.as_ref().is_some_and(|p| p.generation == generation) {
            *pending = None;
            true
        } else {
            false
        }
    }

    /// Push the current document immediately and record the returned stamp.
    ///
    /// # Errors
    ///
    /// Returns the source error if the push fails.
    pub async fn push_now(&self) -> Result<Option<i64>, SourceError> {
        let content = self.document();
        let response = self.inner.source.push_state(&content).await?;
        if !response.success {
            warn!(?response, "server did not accept state");
            return Ok(None);
        }
        if let Some(stamp) = response.last_modified {
            self.local().last_synced = stamp;
            debug!(last_modified = stamp, "state saved");
        }
        Ok(response.last_modified)
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
