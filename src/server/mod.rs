use axum::{
    body::Body,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use hyper::body::Incoming;
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server,
};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, warn};

use crate::{db, error, metrics as counter, telemetry};

pub mod metrics;
pub mod status;
pub mod users;

#[derive(Clone)]
pub struct Dependencies {
    metrics: counter::Metrics,
    db: db::DynUserStorer,
    telemetry: Arc<telemetry::Telemetry>,
}

impl Dependencies {
    pub fn new(
        metrics: counter::Metrics,
        db: db::DynUserStorer,
        telemetry: Arc<telemetry::Telemetry>,
    ) -> Self {
        Self {
            metrics,
            db,
            telemetry,
        }
    }
}

#[derive(Clone)]
pub struct Server {
    addr: String,
    metrics: counter::Metrics,
    db: db::DynUserStorer,
    telemetry: Arc<telemetry::Telemetry>,
}

impl Server {
    pub fn new(
        addr: String,
        metrics: counter::Metrics,
        db: db::DynUserStorer,
        telemetry: Arc<telemetry::Telemetry>,
    ) -> Self {
        debug!(address = addr, "create new server");
        Self {
            addr,
            metrics,
            db,
            telemetry,
        }
    }

    /// Accepts connections until the shutdown token trips. Returning means
    /// the listener has stopped; in-flight connections run to completion on
    /// their own tasks.
    pub async fn serve(&self, shutdown_token: CancellationToken) {
        let deps = Dependencies::new(
            self.metrics.clone(),
            self.db.clone(),
            self.telemetry.clone(),
        );
        let router = create_router(deps);
        let mut make_service = router.into_make_service_with_connect_info::<SocketAddr>();
        let listener = TcpListener::bind(self.addr.clone()).await.unwrap();
        info!(address = self.addr, "serving on address");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((socket, remote_addr)) => {
                            let tower_service = unwrap_infallible(make_service.call(remote_addr).await);
                            tokio::spawn(async move {
                                let socket = TokioIo::new(socket);
                                let hyper_service =
                                    hyper::service::service_fn(move |request: Request<Incoming>| {
                                        tower_service.clone().oneshot(request)
                                    });
                                if let Err(err) = server::conn::auto::Builder::new(TokioExecutor::new())
                                    .serve_connection(socket, hyper_service)
                                    .await
                                {
                                    warn!(err = ?err, "fail serve connection")
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = ?e, "fail accept connection");
                        }
                    }
                }
                _ = shutdown_token.cancelled() => {
                    debug!("shutdown signal received, stopping server");
                    break;
                }
            }
        }
        debug!("server stopped accepting connections");
    }
}

fn unwrap_infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => match err {},
    }
}

pub fn create_router(deps: Dependencies) -> Router {
    status::create_router(deps.clone())
        .merge(metrics::create_router(deps.clone()))
        .merge(users::create_router(deps.clone()))
        .layer(middleware::from_fn_with_state(deps, track_metrics))
}

async fn track_metrics(
    State(state): State<Dependencies>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    state
        .metrics
        .record_request(&route, method.as_str(), response.status().as_u16());
    response
}


impl IntoResponse for error::AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            error::AppError::UserStore(db::UserStoreError::NotFound { id }) => {
                (StatusCode::NOT_FOUND, format!("user id {} not found", id))
            }
            error::AppError::InvalidUser(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason),
        };
        let body = Json(json!({
            "error": error_message,
        }));
        (status, body).into_response()
    }
}
