use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, error, info, warn};

use super::TokenValidator;
use crate::config::DEFAULT_TOKEN_TIMEOUT_MS;

/// Validates credentials against a remote token validation endpoint.
///
/// Each check is a `POST` to the endpoint with the credential, unmodified, in
/// the `Authorization` header and no body. Only a `200 OK` reply accepts the
/// token. Any other status, a connection failure or a timeout rejects it.
///
/// Verdicts are not cached and failed calls are not retried.
///
/// ```rust
/// use review_gate::security::RemoteTokenValidator;
///
/// let validator = RemoteTokenValidator::new("https://auth.example.com/validate")
///     .timeout_ms(2_000);
/// assert_eq!(validator.endpoint(), "https://auth.example.com/validate");
/// ```
pub struct RemoteTokenValidator {
    endpoint: String,
    timeout: Duration,
    client: Option<Client>,
}

impl std::fmt::Debug for RemoteTokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteTokenValidator")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemoteTokenValidator {
    /// Create a validator for `endpoint` with the default 5 second timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let timeout = Duration::from_millis(DEFAULT_TOKEN_TIMEOUT_MS);
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: build_client(timeout),
        }
    }

    /// Configure the total request timeout in milliseconds
    ///
    /// Default: 5000ms
    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    /// Configure the total request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    /// URL the credential is posted to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured request timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }
}

fn build_client(timeout: Duration) -> Option<Client> {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => Some(client),
        Err(e) => {
            error!(error = %e, "Failed to build token validation HTTP client");
            None
        }
    }
}

impl TokenValidator for RemoteTokenValidator {
    fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            warn!("No token provided for validation");
            return false;
        }
        let Some(client) = &self.client else {
            return false;
        };

        debug!(endpoint = %self.endpoint, "Validating token");
        match client
            .post(&self.endpoint)
            .header("Authorization", token)
            .send()
        {
            Ok(resp) if resp.status() == StatusCode::OK => {
                info!("Token validation successful");
                true
            }
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().unwrap_or_default();
                warn!(status, body = %body, "Token validation failed");
                false
            }
            Err(e) => {
                let timed_out = e.is_timeout();
                let e = e.without_url();
                error!(
                    endpoint = %self.endpoint,
                    timed_out,
                    error = %e,
                    "Error calling token validation endpoint"
                );
                false
            }
        }
    }
}
