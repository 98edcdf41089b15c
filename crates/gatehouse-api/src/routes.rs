use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::AppState;
use crate::devices;

/// All device routes, mounted under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let device_routes = Router::new()
        .route("/devices/register", post(devices::register))
        .route("/devices/process-expired", post(devices::process_expired))
        .route("/devices", get(devices::list_devices))
        .route("/devices/disabled", get(devices::list_disabled))
        .route("/devices/rejected", get(devices::list_rejected))
        .route(
            "/devices/disabled/{android_id}/approve",
            patch(devices::reapprove_disabled),
        )
        .route("/devices/{android_id}", get(devices::get_device))
        .route("/devices/{android_id}/approve", patch(devices::approve))
        .route("/devices/{android_id}/extend", patch(devices::extend))
        .route("/devices/{android_id}/disable", patch(devices::disable))
        .route("/devices/{android_id}/reject", patch(devices::reject))
        .route("/devices/{android_id}/status", get(devices::approval_status))
        .route("/devices/{android_id}/approved", get(devices::is_approved))
        .route("/devices/{android_id}/history", get(devices::history))
        .route("/health", get(devices::health))
        .with_state(state);

    Router::new().nest("/api/v1", device_routes)
}
