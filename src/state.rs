//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the SQLite pool, the injected clock, the in-memory signaling
//! backlog, and the write lock that serializes pushes of the singleton
//! state document. The server itself is otherwise stateless.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::ServerConfig;
use crate::services::erp::ErpApi;
use crate::services::notices::PdfStore;
use crate::services::signaling::SignalingBacklog;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<ServerConfig>,
    /// Serializes read-stamp-write of the singleton document.
    pub state_write_lock: Arc<Mutex<()>>,
    pub signaling: SignalingBacklog,
    pub pdfs: PdfStore,
    /// Optional ERP client. `None` if no ERP credential is configured.
    pub erp: Option<Arc<dyn ErpApi>>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: SqlitePool, config: ServerConfig, erp: Option<Arc<dyn ErpApi>>) -> Self {
        Self::with_clock(pool, config, erp, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        pool: SqlitePool,
        config: ServerConfig,
        erp: Option<Arc<dyn ErpApi>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let signaling = SignalingBacklog::new(config.signaling_retention);
        let pdfs = PdfStore::new(config.uploads_dir.clone(), config.pdf_max_bytes);
        Self {
            pool,
            clock,
            config: Arc::new(config),
            state_write_lock: Arc::new(Mutex::new(())),
            signaling,
            pdfs,
            erp,
        }
    }

    /// Current time in epoch milliseconds from the injected clock.
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
