use thiserror::Error;

/// CORS configuration error
///
/// Returned by `OriginPolicyBuilder::build()` when the configuration
/// is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsConfigError {
    /// The allow-list pattern is not a valid regular expression
    #[error("CORS configuration error: invalid origin pattern '{pattern}': {reason}")]
    InvalidOriginPattern {
        /// The pattern as configured
        pattern: String,
        /// Compiler message from `regex`
        reason: String,
    },
    /// The allow-list pattern is not anchored at both ends
    ///
    /// Unanchored patterns would allow partial matches such as
    /// `https://evil.example/?https://app.testdevops.com`.
    #[error("CORS configuration error: origin pattern '{pattern}' must start with '^' and end with '$'")]
    UnanchoredOriginPattern {
        /// The pattern as configured
        pattern: String,
    },
    /// Fallback origin is not of the form `scheme://host[:port]`
    #[error(
        "CORS configuration error: invalid fallback origin '{origin}'. \
        Expected format: scheme://host:port (e.g., https://example.com)"
    )]
    InvalidFallbackOrigin {
        /// The invalid origin string
        origin: String,
    },
}
