use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::server::Dependencies;

pub fn create_router(deps: Dependencies) -> Router {
    let router: Router = Router::new()
        .route("/ping", get(ping))
        .route("/ready", get(ready))
        .with_state(deps);

    router
}

async fn ping() -> (StatusCode, &'static str) {
    info!(route = "/ping", method = "GET", "handle request");
    (StatusCode::OK, "pong")
}

// ready means the user store answers queries
async fn ready(State(state): State<Dependencies>) -> (StatusCode, Json<Value>) {
    info!(route = "/ready", method = "GET", "handle request");

    let service = state.telemetry.service_name();
    match state.db.get_users().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "service": service,
                "status": "ready",
            })),
        ),
        Err(err) => {
            warn!(error = %err, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "service": service,
                    "status": "unavailable",
                })),
            )
        }
    }
}
