//! # CORS Origin Gate
//!
//! Decides which requesting origins are trusted and shapes the CORS headers
//! carried by every response.
//!
//! The gate has three jobs, all driven by one anchored, case-sensitive regex:
//!
//! - [`OriginPolicy::allow_origin`] picks the `Access-Control-Allow-Origin`
//!   value: the request origin when it matches, the configured fallback
//!   otherwise. It never rejects anything.
//! - [`OriginPolicy::preflight`] answers `OPTIONS` requests.
//! - [`OriginPolicy::check`] rejects non-preflight requests whose origin is
//!   absent or not allowed, before authentication runs.

mod builder;
mod error;

pub use builder::OriginPolicyBuilder;
pub use error::CorsConfigError;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::server::response::HeaderVec;

/// `Access-Control-Allow-Headers` entries sent with every response
pub const DEFAULT_ALLOWED_HEADERS: &[&str] = &[
    "Content-Type",
    "Authorization",
    "X-Amz-Date",
    "X-Api-Key",
    "X-Amz-Security-Token",
];

/// Origin allow-list and the CORS header values derived from it.
///
/// Built once at start-up through [`OriginPolicyBuilder`] and shared read-only
/// by all requests.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    pub(crate) pattern: Regex,
    pub(crate) fallback_origin: String,
    pub(crate) allow_headers: String,
    pub(crate) allow_methods: String,
}

impl OriginPolicy {
    /// Whether `origin` matches the allow-list. A missing origin never does.
    #[must_use]
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        origin.is_some_and(|o| self.pattern.is_match(o))
    }

    /// Value for `Access-Control-Allow-Origin`.
    #[must_use]
    pub fn allow_origin<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
        match origin {
            Some(o) if self.pattern.is_match(o) => o,
            _ => &self.fallback_origin,
        }
    }

    /// The origin echoed for untrusted callers
    #[must_use]
    pub fn fallback_origin(&self) -> &str {
        &self.fallback_origin
    }

    /// Answer a CORS preflight request.
    ///
    /// `Ok(())` means the pipeline replies `200` with the success message.
    pub fn preflight(&self, origin: Option<&str>) -> Result<(), PipelineError> {
        if self.is_allowed(origin) {
            debug!("CORS preflight: origin allowed");
            Ok(())
        } else {
            warn!(origin = origin.unwrap_or("<none>"), "CORS preflight: origin not allowed");
            Err(PipelineError::OriginForbidden)
        }
    }

    /// Reject a non-preflight request from an untrusted origin.
    pub fn check(&self, origin: Option<&str>) -> Result<(), PipelineError> {
        if self.is_allowed(origin) {
            Ok(())
        } else {
            warn!(
                origin = origin.unwrap_or("<none>"),
                "Request from disallowed origin"
            );
            Err(PipelineError::OriginForbidden)
        }
    }

    /// Write the standard CORS and content headers for a response.
    pub fn apply_headers(&self, headers: &mut HeaderVec, origin: Option<&str>) {
        headers.push(("Content-Type", "application/json".to_string()));
        headers.push(("Access-Control-Allow-Headers", self.allow_headers.clone()));
        headers.push(("Access-Control-Allow-Methods", self.allow_methods.clone()));
        headers.push((
            "Access-Control-Allow-Origin",
            self.allow_origin(origin).to_string(),
        ));
    }
}

impl Default for OriginPolicy {
    /// The service's built-in allow-list (`*.testdevops.com` over HTTPS).
    fn default() -> Self {
        // The built-in pattern and fallback are compile-time constants that
        // the builder tests cover.
        #[allow(clippy::expect_used)]
        OriginPolicyBuilder::new()
            .build()
            .expect("built-in CORS defaults are valid")
    }
}
