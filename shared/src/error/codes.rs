//! Unified error codes for the KPI service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Evaluation errors
//! - 5xxx: Invitation errors
//! - 8xxx: Employee errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the frontend can
/// switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    NotAuthenticated = 1001,
    TokenExpired = 1003,
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    PermissionDenied = 2001,
    RoleRequired = 2002,

    // ==================== 4xxx: Evaluation ====================
    EvaluationNotFound = 4001,
    EvaluationExists = 4002,
    EvaluationInvalidStatus = 4003,
    ScoreNotFound = 4101,
    TemplateNotFound = 4201,

    // ==================== 5xxx: Invitation ====================
    InvitationNotFound = 5001,
    InvitationInvalidStatus = 5002,
    InvitationIncomplete = 5003,
    InvitedScoreNotFound = 5101,

    // ==================== 8xxx: Employee ====================
    EmployeeNotFound = 8001,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    ConfigError = 9005,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",

            // Evaluation
            ErrorCode::EvaluationNotFound => "Evaluation not found",
            ErrorCode::EvaluationExists => "Evaluation already exists for this period",
            ErrorCode::EvaluationInvalidStatus => {
                "Evaluation is not in the required status"
            }
            ErrorCode::ScoreNotFound => "Score not found",
            ErrorCode::TemplateNotFound => "KPI template not found",

            // Invitation
            ErrorCode::InvitationNotFound => "Invitation not found",
            ErrorCode::InvitationInvalidStatus => "Invitation is not in the required status",
            ErrorCode::InvitationIncomplete => "All items must be scored before completing",
            ErrorCode::InvitedScoreNotFound => "Invited score not found",

            // Employee
            ErrorCode::EmployeeNotFound => "Employee not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),

            // Evaluation
            4001 => Ok(ErrorCode::EvaluationNotFound),
            4002 => Ok(ErrorCode::EvaluationExists),
            4003 => Ok(ErrorCode::EvaluationInvalidStatus),
            4101 => Ok(ErrorCode::ScoreNotFound),
            4201 => Ok(ErrorCode::TemplateNotFound),

            // Invitation
            5001 => Ok(ErrorCode::InvitationNotFound),
            5002 => Ok(ErrorCode::InvitationInvalidStatus),
            5003 => Ok(ErrorCode::InvitationIncomplete),
            5101 => Ok(ErrorCode::InvitedScoreNotFound),

            // Employee
            8001 => Ok(ErrorCode::EmployeeNotFound),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
