//! Axum middleware layers applied to the router.
//!
//! Includes the single-origin CORS policy and the per-request timeout.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long browsers may cache a preflight response.
pub const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Build a CORS layer that admits exactly one origin.
///
/// Preflights from any other origin get no `Access-Control-Allow-Origin`
/// header, which makes the browser refuse the actual request.
///
/// # Errors
///
/// Returns an error if `allowed_origin` is not a valid header value.
pub fn cors(allowed_origin: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(allowed_origin)
        .with_context(|| format!("invalid CORS origin: {allowed_origin:?}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::HEAD,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE))
}
