pub mod health;
pub mod messages;
pub mod payments;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// All routes are public: inbound webhooks are authenticated by account id
/// and verify token, payment callbacks by HMAC signature.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/messages/webhook",
            get(messages::verify).post(messages::inbound),
        )
        .route("/payments/callback", post(payments::callback))
}

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}
