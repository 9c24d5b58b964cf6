use axum::{
    extract::Request,
    http::{header, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Redirects `/foo/` to `/foo` and lower-cases every other path before it
/// reaches the router.
pub async fn normalize_path_middleware(mut request: Request, next: Next) -> Response {
    let path = request.uri().path();

    if path.len() > 1 && path.ends_with('/') {
        let mut location = path.trim_end_matches('/').to_string();
        if location.is_empty() {
            location.push('/');
        }
        if let Some(query) = request.uri().query() {
            location.push('?');
            location.push_str(query);
        }

        return match HeaderValue::from_str(&location) {
            Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
            Err(_) => StatusCode::BAD_REQUEST.into_response(),
        };
    }

    if path.bytes().any(|b| b.is_ascii_uppercase()) {
        if let Some(uri) = lowercase_path(request.uri()) {
            *request.uri_mut() = uri;
        }
    }

    next.run(request).await
}

fn lowercase_path(uri: &Uri) -> Option<Uri> {
    let mut path_and_query = uri.path().to_ascii_lowercase();
    if let Some(query) = uri.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}
