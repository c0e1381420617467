//! Router setup with all API routes and middleware.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    // Permissive CORS so a separately served front-end can call the API.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/parameters", put(handlers::update_parameters))
        .route("/sessions/{id}/start", post(handlers::start_session))
        .route("/sessions/{id}/opening/retry", post(handlers::retry_opening))
        .route("/sessions/{id}/turns", post(handlers::send_turn))
        .route("/sessions/{id}/feedback/retry", post(handlers::retry_feedback))
        .route("/sessions/{id}/navigate", post(handlers::navigate))
        .route("/sessions/{id}/reset", post(handlers::reset_session))
        .layer(cors)
        .with_state(state)
}
