//! # Auth Gate
//!
//! Extracts the caller's credential and asks a [`TokenValidator`] whether it is
//! acceptable.
//!
//! ## Credential extraction
//!
//! The credential is the raw value of the `Authorization` header, falling back
//! to `authorization`. Header names are matched exactly, and the value is
//! passed through untouched: a `Bearer ` prefix is neither required nor
//! stripped. An empty value counts as absent.
//!
//! ## Validators
//!
//! - [`RemoteTokenValidator`] POSTs to an external validation endpoint and
//!   accepts only a `200` reply.
//! - Any `Fn(&str) -> bool + Send + Sync` closure is a validator too, which is
//!   how tests plug in fixed answers.
//!
//! ```rust
//! use review_gate::security::{authorize, SecurityRequest};
//! use std::collections::HashMap;
//!
//! let mut headers = HashMap::new();
//! headers.insert("Authorization".to_string(), "Bearer abc".to_string());
//! let req = SecurityRequest::new(&headers);
//!
//! let accept_abc = |token: &str| token == "Bearer abc";
//! assert!(authorize(&req, Some(&accept_abc)).is_ok());
//! ```

mod remote_token;

pub use remote_token::RemoteTokenValidator;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::PipelineError;

/// Header names searched for the credential, in order
pub const CREDENTIAL_HEADERS: [&str; 2] = ["Authorization", "authorization"];

/// Header view handed to the auth gate.
#[derive(Debug, Clone, Copy)]
pub struct SecurityRequest<'a> {
    /// Request headers, keyed by the name exactly as received
    pub headers: &'a HashMap<String, String>,
}

impl<'a> SecurityRequest<'a> {
    /// Wrap a header map
    pub fn new(headers: &'a HashMap<String, String>) -> Self {
        Self { headers }
    }

    /// Get a header by its exact name
    #[inline]
    pub fn get_header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The caller's credential, if one was sent.
    pub fn credential(&self) -> Option<&'a str> {
        CREDENTIAL_HEADERS
            .iter()
            .filter_map(|name| self.get_header(name))
            .find(|value| !value.is_empty())
    }
}

/// Decides whether a credential is currently valid.
///
/// Implementations must not panic and must treat every failure to reach a
/// verdict (network error, timeout, malformed reply) as `false`.
pub trait TokenValidator: Send + Sync {
    /// `true` when `token` is accepted.
    fn validate(&self, token: &str) -> bool;
}

impl<F> TokenValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn validate(&self, token: &str) -> bool {
        self(token)
    }
}

/// Run the auth gate.
///
/// With no validator configured every credential is rejected.
pub fn authorize(
    req: &SecurityRequest<'_>,
    validator: Option<&dyn TokenValidator>,
) -> Result<(), PipelineError> {
    let Some(token) = req.credential() else {
        warn!("Authorization header missing");
        return Err(PipelineError::AuthMissing);
    };
    let Some(validator) = validator else {
        warn!("No token validator configured, rejecting credential");
        return Err(PipelineError::AuthInvalid);
    };
    if validator.validate(token) {
        debug!("Token validated");
        Ok(())
    } else {
        warn!("Token validation failed");
        Err(PipelineError::AuthInvalid)
    }
}
