use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::middleware::RateLimiter;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub message: String,
}

/// Liveness plus the caller's view of the current rate-limit window. The
/// window is read, never counted.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is running", body = HealthResponse),
        (status = 500, description = "Rate-limit state could not be read")
    ),
    tag = "Health"
)]
pub async fn health(
    State(limiter): State<RateLimiter>,
) -> AppResult<(HeaderMap, Json<HealthResponse>)> {
    let status = limiter.snapshot().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read rate limit state");
        AppError::Internal(format!("rate limiter unavailable: {}", e))
    })?;

    let mut headers = HeaderMap::new();
    status.apply_headers(&mut headers);

    Ok((
        headers,
        Json(HealthResponse {
            message: "server is running".to_string(),
        }),
    ))
}
