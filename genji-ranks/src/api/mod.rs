//! HTTP API handlers for genji-ranks

pub mod health;
pub mod maps;
pub mod ranks;
pub mod sse;

pub use health::health_routes;
pub use maps::{get_map, rate_map, set_archived, submit_map};
pub use ranks::{get_last_submission, get_ranks, sync_ranks};
pub use sse::event_stream;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::Error;
use crate::membership::MembershipError;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        use genji_common::Error as Common;

        let (status, error_code) = match &self {
            Error::Common(Common::InvalidInput(_)) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Error::Common(Common::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Common(Common::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            Error::Common(Common::Database(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR")
            }
            Error::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Error::Membership(MembershipError::RateLimited(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "RATE_LIMITED")
            }
            Error::Membership(_) => (StatusCode::INTERNAL_SERVER_ERROR, "MEMBERSHIP_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
