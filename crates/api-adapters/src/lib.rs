//! # api-adapters
//!
//! The web routing and orchestration layer for the news board.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};

pub use error::ApiError;
pub use state::{AppState, Limits};

/// Builds the application router.
///
/// Paths keep their trailing slash, e.g. `/news/7/`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/about/", get(handlers::about))
        .route("/register/", post(handlers::register))
        .route("/login/", post(handlers::login))
        .route("/logout/", get(handlers::logout).post(handlers::logout))
        .route("/news/", get(handlers::posts))
        .route("/news/{newspost_id}/", get(handlers::post_specific))
        .route("/news/{newspost_id}/comment/", post(handlers::post_comment))
        .layer(middleware::propagate_request_id())
        .layer(middleware::trace_layer())
        .layer(middleware::set_request_id())
        .layer(middleware::cors_policy())
        .with_state(state)
}
