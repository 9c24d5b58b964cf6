use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{self, GatewayState};
use crate::config::Settings;
use crate::domain::services::{CommandBlocklist, RequestTranslator};
use crate::infrastructure::SharedStore;
use crate::middleware::{
    cors_middleware, normalize_path_middleware, rate_limit_middleware, CorsState, RateLimiter,
};

/// Builds the gateway.
///
/// Commands run against `demo`; rate-limit counters and the last cleanup
/// time are kept in `admin`, so a demo flush never resets anyone's quota.
pub fn create_router(demo: SharedStore, admin: SharedStore, settings: &Settings) -> Router {
    let gateway_state = GatewayState {
        store: demo,
        translator: RequestTranslator::new(CommandBlocklist::new(
            settings.commands.blocklist_enabled,
        )),
    };
    let limiter = RateLimiter::from_settings(admin, settings);
    let cors_state = CorsState::new(settings.cors.allowed_origins.0.clone());

    let shell_routes = Router::new()
        .route("/shell/exec", post(handlers::execute_command))
        .route("/shell/exec/{command}", post(handlers::execute_command))
        .with_state(gateway_state);

    let routes = Router::new()
        .route("/health", get(handlers::health))
        .with_state(limiter.clone())
        .route("/search", get(handlers::search))
        .merge(shell_routes);

    // Routing happens inside the fallback so the middleware below sees the
    // request before the path is matched, and the rewritten path is the one
    // that gets routed.
    Router::new()
        .fallback_service(routes)
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(middleware::from_fn_with_state(cors_state, cors_middleware))
        .layer(middleware::from_fn(normalize_path_middleware))
        .layer(TimeoutLayer::new(settings.server.request_timeout()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
