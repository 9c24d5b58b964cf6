use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS, PUT, DELETE, PATCH";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, Content-Length";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Origins allowed to call the gateway. `*` admits any origin.
#[derive(Debug, Clone)]
pub struct CorsState {
    allowed_origins: Arc<Vec<String>>,
}

impl CorsState {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Arc::new(allowed_origins),
        }
    }

    /// An absent or empty origin is always allowed so non-browser clients
    /// get through. Origins are compared as raw header bytes, so a value that
    /// is not valid UTF-8 only passes through the wildcard.
    pub fn is_allowed(&self, origin: &[u8]) -> bool {
        origin.is_empty()
            || self
                .allowed_origins
                .iter()
                .any(|allowed| allowed == "*" || allowed.as_bytes() == origin)
    }
}

pub async fn cors_middleware(
    State(state): State<CorsState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    let origin_bytes = origin.as_ref().map(HeaderValue::as_bytes).unwrap_or_default();

    if !state.is_allowed(origin_bytes) {
        tracing::debug!(
            origin = %String::from_utf8_lossy(origin_bytes),
            "Rejecting request from disallowed origin"
        );
        return AppError::OriginNotAllowed.into_response();
    }

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    if let Some(origin) = origin.filter(|value| !value.is_empty()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(PREFLIGHT_MAX_AGE),
    );

    response
}
