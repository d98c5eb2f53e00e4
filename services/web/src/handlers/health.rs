use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

/// Readiness probe for `GET /readyz`: 200 while the database answers a ping.
pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.db.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
