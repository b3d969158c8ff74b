use axum::{
    debug_handler,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus_client::encoding::text::encode;
use tracing::{info, warn};

use crate::server::Dependencies;

const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

pub fn create_router(deps: Dependencies) -> Router {
    let router: Router = Router::new()
        .route("/metrics", get(metrics))
        .with_state(deps);

    router
}

#[debug_handler]
async fn metrics(State(state): State<Dependencies>) -> Response {
    info!(route = "/metrics", method = "GET", "handle request");

    let mut body = String::new();
    if let Err(err) = encode(&mut body, &state.metrics.registry) {
        warn!(error = %err, "fail encode metrics registry");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response()
}
