//! Failure taxonomy of the review pipeline.
//!
//! Every stage that can short-circuit returns a [`PipelineError`]. The service
//! converts it into a response envelope through [`PipelineError::status_code`]
//! and [`PipelineError::body`], so no failure ever leaves the pipeline as a
//! fault.

use serde_json::{json, Value};
use thiserror::Error;

/// Fixed response message for a disallowed origin.
pub const ORIGIN_NOT_ALLOWED: &str = "Origin not allowed.";
/// Fixed response message when no credential header was sent.
pub const AUTH_HEADER_MISSING: &str = "Authorization header is missing.";
/// Fixed response message for any token validation failure.
pub const TOKEN_INVALID: &str = "Invalid or expired token.";
/// Fixed response message for an unparsable request body.
pub const INVALID_JSON: &str = "Invalid JSON format.";
/// Fixed response message for a failed store write.
pub const SAVE_FAILED: &str = "Could not save review.";

/// Errors that terminate a single pipeline invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// A required setting is missing; `0` is the caller-facing message.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The `Origin` header is absent or does not match the allow-list.
    #[error("origin forbidden")]
    OriginForbidden,
    /// No credential header was supplied.
    #[error("authorization header missing")]
    AuthMissing,
    /// The token validator rejected the credential, or could not be reached.
    #[error("invalid or expired token")]
    AuthInvalid,
    /// The request body is not a JSON object.
    #[error("malformed request body")]
    BodyMalformed,
    /// One or more field or threat checks failed.
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),
    /// The store write failed. The cause is logged, never returned.
    #[error("persistence failure")]
    PersistenceFailure,
}

impl PipelineError {
    /// HTTP status code for this failure.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Configuration(_) | Self::BodyMalformed | Self::ValidationFailed(_) => 400,
            Self::OriginForbidden => 403,
            Self::AuthMissing | Self::AuthInvalid => 401,
            Self::PersistenceFailure => 500,
        }
    }

    /// JSON body for this failure.
    #[must_use]
    pub fn body(&self) -> Value {
        match self {
            Self::Configuration(message) => {
                json!({ "error": "Bad Request", "message": message })
            }
            Self::OriginForbidden => {
                json!({ "error": "Forbidden", "message": ORIGIN_NOT_ALLOWED })
            }
            Self::AuthMissing => {
                json!({ "error": "Unauthorized", "message": AUTH_HEADER_MISSING })
            }
            Self::AuthInvalid => json!({ "error": "Unauthorized", "message": TOKEN_INVALID }),
            Self::BodyMalformed => json!({ "error": "Bad Request", "message": INVALID_JSON }),
            Self::ValidationFailed(messages) => {
                json!({ "error": "Bad Request", "messages": messages })
            }
            Self::PersistenceFailure => {
                json!({ "error": "Internal Server Error", "message": SAVE_FAILED })
            }
        }
    }
}
