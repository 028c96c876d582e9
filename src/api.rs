//! HTTP surface: `POST /api` and `GET /healthz`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::RequestError;
use crate::models::{AnswerResponse, HealthBody, QueryRequest};
use crate::pipeline::AnswerService;

/// Default request body cap (20 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Builds the application router around `service`, accepting request bodies
/// up to `max_body_bytes`.
pub fn router(service: AnswerService, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/api", post(ask_handler))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn ask_handler(
    State(service): State<AnswerService>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, RequestError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RequestError::PayloadTooLarge(rejection.body_text())
        } else {
            RequestError::MalformedBody(rejection.body_text())
        }
    })?;
    let response = service.answer(request).await?;
    Ok(Json(response))
}

async fn healthz(State(service): State<AnswerService>) -> Json<HealthBody> {
    let store = service.store();
    Json(HealthBody {
        status: "ok".to_string(),
        chunks: store.len(),
        dimension: store.dimension(),
    })
}
