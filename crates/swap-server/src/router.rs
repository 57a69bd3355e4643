use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all Section Swap endpoints.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/api/health", get(handler::health_handler))
        .route(
            "/api/swap-requests",
            get(handler::list_handler).post(handler::submit_handler),
        )
        .route(
            "/api/find-matches/:current_section/:desired_section",
            get(handler::find_matches_handler),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
