//! Axum request handlers for all service endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{MessageResponse, ServiceError};
use tracing::{debug, warn};

use super::state::AppState;

/// Body of the 404 returned by `GET /fortunes/:id`.
pub const FORTUNE_NOT_FOUND: &str = "fortune not found";
/// Body of the 500 returned when `GET /fortunes` cannot read the table.
pub const LIST_FAILED: &str = "failed to list fortunes";

/// `GET /` — fixed greeting.
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello"))
}

/// `GET /fortunes` — every fortune in the table, as `[{id, name}, ...]`.
///
/// Only the first scan page is returned. A failed scan yields `500`.
pub async fn list_fortunes(State(state): State<AppState>) -> Response {
    match state.store.scan().await {
        Ok(fortunes) => (StatusCode::OK, Json(fortunes)).into_response(),
        Err(e) => {
            warn!(error = %e, "couldn't list fortunes");
            error_response(ServiceError::Internal(LIST_FAILED.into()))
        }
    }
}

/// `GET /fortunes/:id` — one fortune by id.
///
/// A non-integer id, an unknown id, and a failed lookup all answer `404`
/// with the same body.
pub async fn get_fortune(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let missing = || error_response(ServiceError::NotFound(FORTUNE_NOT_FOUND.into()));

    let Ok(id) = raw_id.parse::<i64>() else {
        debug!(raw_id = %raw_id, "fortune id is not an integer");
        return missing();
    };

    match state.store.get(id).await {
        Ok(Some(fortune)) => (StatusCode::OK, Json(fortune)).into_response(),
        Ok(None) => missing(),
        Err(e) => {
            warn!(id, error = %e, "failed to get fortune");
            missing()
        }
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(ServiceError::NotFound(
        "the requested resource does not exist".into(),
    ))
}

/// Render a [`ServiceError`] as `{"message": ...}` with its status code.
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(MessageResponse::new(err.message()))).into_response()
}
