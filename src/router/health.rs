//! Liveness probe.

use axum::http::StatusCode;

/// Report the server as alive. Body stays empty on purpose.
pub async fn handler() -> StatusCode {
    StatusCode::OK
}
