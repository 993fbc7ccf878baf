//! Router and handlers.
//!
//! `POST /api/grade` accepts `{ "image": "data:<mime>;base64,<payload>" }`,
//! strips the data-URL wrapper before the core sees bytes, and answers
//! `{ "results": [...] }` on success or `{ "error": "..." }` on failure.

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::ApiContext;
use crate::grading::{GradingResult, RawImage};

/// Request body cap: a 50 MB image grows ~4/3 under base64.
const MAX_BODY_BYTES: usize = 70 * 1024 * 1024;

/// Build the API router.
pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/grade", post(grade))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /api/health` — liveness check.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}

#[derive(Deserialize)]
struct GradeBody {
    image: Option<String>,
}

#[derive(Serialize)]
struct GradeResponse {
    results: Vec<GradingResult>,
}

/// `POST /api/grade` — grade one worksheet photo.
///
/// The grading task is spawned so its `AbortHandle` can be stored in
/// shared state; a newer submission aborts this one, which then
/// answers 409 instead of delivering a stale result.
async fn grade(
    State(ctx): State<ApiContext>,
    Json(body): Json<GradeBody>,
) -> Result<Json<GradeResponse>, ApiError> {
    let image = body
        .image
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No image provided.".into()))?;

    let raw = decode_data_url(&image)?;

    let pipeline = ctx.pipeline.clone();
    let task = tokio::spawn(async move { pipeline.grade(raw).await });
    ctx.supersede(task.abort_handle());

    match task.await {
        Ok(Ok(outcome)) => Ok(Json(GradeResponse {
            results: outcome.results,
        })),
        Ok(Err(err)) => Err(err.into()),
        Err(join) if join.is_cancelled() => Err(ApiError::Superseded),
        Err(join) => Err(ApiError::Internal(join.to_string())),
    }
}

/// Unwrap a `data:<mime>;base64,<payload>` string into raw bytes plus
/// the declared media type. A bare base64 string (no data-URL prefix)
/// is accepted as-is with a JPEG assumption — decode catches lies.
fn decode_data_url(input: &str) -> Result<RawImage, ApiError> {
    let input = input.trim();

    let (media_type, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                ApiError::BadRequest("Malformed data URL: missing payload.".into())
            })?;
            let media_type = header
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            (media_type, payload)
        }
        None => ("image/jpeg".to_string(), input),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| ApiError::BadRequest("Image payload is not valid base64.".into()))?;

    Ok(RawImage::new(bytes, media_type))
}
