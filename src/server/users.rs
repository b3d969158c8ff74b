use axum::{
    debug_handler,
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use opentelemetry::global::BoxedSpan;
use opentelemetry::trace::{Span, Status, Tracer};
use tracing::info;

use crate::db::{CreateUser, UpdateUser, User, UserStoreError};
use crate::error::AppError;
use crate::server::Dependencies;

const NAME_LEN_MAX: usize = 50;

pub fn create_router(deps: Dependencies) -> Router {
    let router: Router = Router::new()
        .route("/v1/user", get(list_users))
        .route("/v1/user", put(create_user))
        .route("/v1/user/{id}", get(get_user))
        .route("/v1/user/{id}", post(update_user))
        .route("/v1/user/{id}", delete(delete_user))
        .with_state(deps);
    router
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.chars().count() > NAME_LEN_MAX {
        return Err(AppError::InvalidUser(format!(
            "name must be 1 to {} characters",
            NAME_LEN_MAX
        )));
    }
    Ok(())
}

fn finish_span<T>(mut span: BoxedSpan, result: &Result<T, UserStoreError>) {
    if let Err(err) = result {
        span.set_status(Status::error(err.to_string()));
    }
    span.end();
}

#[debug_handler]
async fn list_users(State(state): State<Dependencies>) -> Result<Json<Vec<User>>, AppError> {
    info!(route = "/v1/user", method = "GET", "handle request");

    let span = state.telemetry.tracer().start("list_users");
    let result = state.db.get_users().await;
    finish_span(span, &result);

    Ok(Json(result?))
}

#[debug_handler]
async fn get_user(
    State(state): State<Dependencies>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    info!(route = "/v1/user/{id}", method = "GET", id = id, "handle request");

    let span = state.telemetry.tracer().start("get_user");
    let result = state.db.get_user(id).await;
    finish_span(span, &result);

    Ok(Json(result?))
}

#[debug_handler]
async fn create_user(
    State(state): State<Dependencies>,
    Json(payload): Json<CreateUser>,
) -> Result<Json<User>, AppError> {
    info!(route = "/v1/user", method = "PUT", "handle request");
    validate_name(&payload.name)?;

    let span = state.telemetry.tracer().start("create_user");
    let result = state.db.create_user(payload).await;
    finish_span(span, &result);

    Ok(Json(result?))
}

#[debug_handler]
async fn update_user(
    State(state): State<Dependencies>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    info!(route = "/v1/user/{id}", method = "POST", id = id, "handle request");
    validate_name(&payload.name)?;

    let span = state.telemetry.tracer().start("update_user");
    let result = state.db.update_user(id, payload).await;
    finish_span(span, &result);

    Ok(Json(result?))
}

#[debug_handler]
async fn delete_user(
    State(state): State<Dependencies>,
    Path(id): Path<i64>,
) -> Result<(), AppError> {
    info!(route = "/v1/user/{id}", method = "DELETE", id = id, "handle request");

    let span = state.telemetry.tracer().start("delete_user");
    let result = state.db.delete_user(id).await;
    finish_span(span, &result);

    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, metrics, server, telemetry};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let metrics = metrics::Metrics::new();
        let store: db::DynUserStorer = Arc::new(db::InMemory::new(metrics.clone()));
        let telemetry = Arc::new(telemetry::Telemetry::new("usersvc-test"));
        server::create_router(server::Dependencies::new(metrics, store, telemetry))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn put_user(name: &str) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri("/v1/user")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"name":"{}"}}"#, name)))
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_get_user() {
        let router = test_router();

        let response = router.clone().oneshot(put_user("alice")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "alice");

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/v1/user/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["name"], "alice");
    }

    #[tokio::test]
    async fn missing_user_returns_not_found() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/v1/user/99")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "user id 99 not found");
    }

    #[tokio::test]
    async fn invalid_name_is_rejected() {
        let router = test_router();

        let response = router.clone().oneshot(put_user("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let long_name = "x".repeat(NAME_LEN_MAX + 1);
        let response = router.oneshot(put_user(&long_name)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_and_delete_user() {
        let router = test_router();
        router.clone().oneshot(put_user("bob")).await.unwrap();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/user/1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"robert"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["name"], "robert");

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/user/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/v1/user")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed, serde_json::json!([]));
    }
}
