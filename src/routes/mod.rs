//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every kiosk talks to this one router over plain JSON. The `/api/*`
//! endpoints cover state sync, the signaling/notification relay, the device
//! registry, staff records, PDF notices and the ERP proxy. Uploaded PDFs are
//! served statically under `/uploads/pdfs`. The same router is bound to both
//! the HTTP and the optional HTTPS listener.

pub mod devices;
pub mod erp;
pub mod notices;
pub mod relay;
pub mod staff;
pub mod sync;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{delete, get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use wire::HealthResponse;

use crate::clock::iso_timestamp;
use crate::services::notices::PUBLIC_PREFIX;
use crate::state::AppState;

/// Request body ceiling. Large enough for a state document carrying many
/// layouts and for a maximum-size PDF plus multipart framing.
const JSON_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = JSON_BODY_LIMIT.max(state.pdfs.max_bytes() + 64 * 1024);
    let uploads = ServeDir::new(state.pdfs.dir());

    Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(sync::get_state).post(sync::push_state))
        .route("/api/signaling", get(relay::receive_signaling).post(relay::send_signaling))
        .route("/api/devices", get(devices::list))
        .route("/api/devices/register", post(devices::register))
        .route("/api/devices/{device_id}", patch(devices::rename))
        .route("/api/messages", get(relay::list_messages).post(relay::send_message))
        .route("/api/notifications", post(relay::send_notification))
        .route(
            "/api/notifications/{id}",
            get(relay::list_notifications).delete(relay::delete_notification),
        )
        .route("/api/notifications/{id}/read", patch(relay::mark_notification_read))
        .route("/api/employees", get(staff::list_employees).post(staff::create_employee))
        .route("/api/employees/{id}", put(staff::update_employee).delete(staff::delete_employee))
        .route("/api/training-records", get(staff::list_training).post(staff::create_training))
        .route("/api/training-records/{id}", delete(staff::delete_training))
        .route("/api/upload-pdf", post(notices::upload))
        .route("/api/delete-pdf", delete(notices::delete))
        .route("/api/fulcrum/inventory", get(erp::inventory))
        .route("/api/fulcrum/operations", get(erp::operations))
        .route("/api/fulcrum/production", get(erp::production))
        .route("/api/fulcrum/employees", get(erp::employees))
        .route("/api/fulcrum/timeclock/timers", get(erp::timers))
        .route("/api/fulcrum/timeclock/clock-in", post(erp::clock_in))
        .route("/api/fulcrum/timeclock/clock-out", post(erp::clock_out))
        .nest_service(PUBLIC_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api/health` — liveness plus server time.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_owned(), timestamp: iso_timestamp(state.now_ms()) })
}

// =============================================================================
// TEST SUPPORT
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
