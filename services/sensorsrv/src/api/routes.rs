//! API routes configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::logging::http_request_logger;
use tower_http::trace::TraceLayer;

use crate::api::handlers::*;
use crate::auth::require_bearer;
use crate::websocket::ws_handler;
use crate::AppState;

/// Create API routes
///
/// `/send_data`, `/events` and `/simulate` sit behind the bearer check when an
/// auth gate is configured; `/login` is only served in that case.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/send_data", post(send_data))
        .route("/events", get(list_events))
        .route("/simulate", post(simulate));

    let protected = match state.auth.clone() {
        Some(gate) => {
            protected.route_layer(middleware::from_fn_with_state(gate, require_bearer))
        },
        None => protected,
    };

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws_handler))
        .merge(protected);

    if let Some(gate) = state.auth.clone() {
        router = router.merge(Router::new().route("/login", post(login)).with_state(gate));
    }

    router
        .layer(middleware::from_fn(http_request_logger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
