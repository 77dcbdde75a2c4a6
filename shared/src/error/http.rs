//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::EvaluationNotFound
            | Self::ScoreNotFound
            | Self::TemplateNotFound
            | Self::InvitationNotFound
            | Self::InvitedScoreNotFound
            | Self::EmployeeNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::RoleRequired => StatusCode::FORBIDDEN,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError | Self::Unknown => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (validation / workflow precondition)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::EvaluationExists
            | Self::EvaluationInvalidStatus
            | Self::InvitationInvalidStatus
            | Self::InvitationIncomplete => StatusCode::BAD_REQUEST,
        }
    }
}
