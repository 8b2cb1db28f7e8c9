use axum::{extract::State, http::StatusCode, routing::get, Router};
use serde_json::json;
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::utils::api_response::ApiResponse;

#[derive(OpenApi)]
#[openapi(paths(liveness, readiness))]
pub struct HealthDoc;

pub fn health_routes() -> Router<PgPool> {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Process is up"))
)]
pub async fn liveness() -> ApiResponse<serde_json::Value> {
    ApiResponse::success(StatusCode::OK, "OK", json!({ "status": "up" }))
}

/// Readiness additionally round-trips the database.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Database reachable"),
        (status = 503, description = "Database unreachable")
    )
)]
pub async fn readiness(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<serde_json::Value>, ApiResponse<()>> {
    sqlx::query("SELECT 1").execute(&pool).await.map_err(|e| {
        tracing::warn!("readiness probe failed: {e}");
        ApiResponse::error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Database unreachable",
            None,
        )
    })?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "OK",
        json!({ "status": "ready" }),
    ))
}
