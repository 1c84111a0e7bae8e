//! HTTP mapping of [`GatherBuddyError`]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};
use crate::utils::errors::{ErrorSeverity, GatherBuddyError};

impl GatherBuddyError {
    /// HTTP status for an API failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatherBuddyError::InvalidInput(_)
            | GatherBuddyError::UrlParse(_)
            | GatherBuddyError::Serialization(_)
            | GatherBuddyError::SlotNotFound { .. } => StatusCode::BAD_REQUEST,
            GatherBuddyError::Authentication(_)
            | GatherBuddyError::Session(_)
            | GatherBuddyError::TokenInvalid => StatusCode::UNAUTHORIZED,
            GatherBuddyError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            GatherBuddyError::EventNotFound { .. } | GatherBuddyError::ParticipantNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            GatherBuddyError::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            GatherBuddyError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GatherBuddyError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatherBuddyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self.severity() {
            ErrorSeverity::Info => {}
            ErrorSeverity::Warning => warn!(status = status.as_u16(), error = %self, "Request rejected"),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                error!(status = status.as_u16(), error = %self, "Request failed")
            }
        }

        (status, Json(serde_json::json!({ "error": self.user_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(GatherBuddyError::InvalidInput("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(GatherBuddyError::TokenInvalid.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatherBuddyError::PermissionDenied("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            GatherBuddyError::EventNotFound { slug: "x".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GatherBuddyError::InvalidStateTransition { from: "CANCELLED".into(), to: "FINALIZED".into() }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            GatherBuddyError::Config("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_body_is_generic_for_auth_failures() {
        let response = GatherBuddyError::PermissionDenied("telegram:1 is not telegram:2".into()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
