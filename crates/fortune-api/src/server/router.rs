//! Axum router construction.

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// # Errors
///
/// Returns an error if `allowed_origin` cannot be used as a CORS origin.
pub fn build(state: AppState, allowed_origin: &str) -> Result<Router> {
    Ok(Router::new()
        .route("/", get(handlers::root))
        .route("/fortunes", get(handlers::list_fortunes))
        .route("/fortunes/:id", get(handlers::get_fortune))
        .fallback(handlers::not_found)
        .layer(middleware::cors(allowed_origin)?)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state))
}
