use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::{handlers, state::AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::healthcheck))
        .route("/api/connections", post(handlers::post_connection))
        .route("/api/connections/:member_id", get(handlers::get_connections))
        .route(
            "/api/shared-connections/:member_id1/:member_id2",
            get(handlers::get_shared_connections),
        )
        .route("/api/distances", post(handlers::post_distances))
        .route("/api/stats", get(handlers::get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
