//! Type-safe error codes for API responses.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::Conflict;
//! assert_eq!(code.as_str(), "CONFLICT");
//! assert_eq!(code.code(), 1008);
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error identifiers shared by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body failed field validation
    ValidationError,
    /// Malformed UUID in path or query
    InvalidUuid,
    /// Request body could not be parsed
    JsonExtraction,
    /// Referenced entity does not exist
    NotFound,
    /// Input is well-formed but violates a policy (e.g. event date too soon)
    BadRequest,
    /// Caller has no rights over the entity
    Forbidden,
    /// Business rule or lifecycle state violation
    Conflict,
    /// A collaborator (stats service) could not be reached
    ServiceUnavailable,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidUuid => "INVALID_UUID",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::NotFound => "NOT_FOUND",
            Self::BadRequest => "BAD_REQUEST",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict => "CONFLICT",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidUuid => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::BadRequest => 1006,
            Self::Forbidden => 1007,
            Self::Conflict => 1008,
            Self::ServiceUnavailable => 1011,
        }
    }

    /// Fixed, client-facing explanation of the error class.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ValidationError
            | Self::InvalidUuid
            | Self::JsonExtraction
            | Self::BadRequest => "Incorrectly made request.",
            Self::NotFound => "The required object was not found.",
            Self::Forbidden => "For the requested operation the conditions are not met.",
            Self::Conflict => "Integrity constraint has been violated.",
            Self::ServiceUnavailable => "A dependent service is not available.",
            Self::InternalError => "An unexpected error occurred.",
        }
    }
}
