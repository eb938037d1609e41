use http::Method;
use regex::Regex;

use super::{CorsConfigError, OriginPolicy, DEFAULT_ALLOWED_HEADERS};
use crate::config::{ServiceConfig, DEFAULT_ALLOWED_ORIGIN_PATTERN, DEFAULT_FALLBACK_ORIGIN};

/// Builder for creating an [`OriginPolicy`] with a fluent API
///
/// # Example
///
/// ```rust
/// use review_gate::cors::OriginPolicyBuilder;
///
/// let policy = OriginPolicyBuilder::new()
///     .allowed_origin_pattern(r"^https://([a-z0-9-]+\.)*example\.com$")
///     .fallback_origin("https://www.example.com")
///     .build()
///     .expect("valid CORS configuration");
/// assert!(policy.is_allowed(Some("https://shop.example.com")));
/// ```
pub struct OriginPolicyBuilder {
    allowed_origin_pattern: String,
    fallback_origin: String,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
}

impl OriginPolicyBuilder {
    /// Create a new builder with the service defaults
    ///
    /// Default configuration:
    /// - Pattern: HTTPS subdomains of `testdevops.com`, optional port
    /// - Fallback origin: `https://api.testdevops.com`
    /// - Headers: `Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token`
    /// - Methods: `POST, OPTIONS`
    pub fn new() -> Self {
        Self {
            allowed_origin_pattern: DEFAULT_ALLOWED_ORIGIN_PATTERN.to_string(),
            fallback_origin: DEFAULT_FALLBACK_ORIGIN.to_string(),
            allowed_headers: DEFAULT_ALLOWED_HEADERS
                .iter()
                .map(|h| h.to_string())
                .collect(),
            allowed_methods: vec![Method::POST, Method::OPTIONS],
        }
    }

    /// Start from the origin settings of a loaded [`ServiceConfig`]
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new()
            .allowed_origin_pattern(&config.allowed_origin_pattern)
            .fallback_origin(&config.fallback_origin)
    }

    /// Set the regex an `Origin` header must match
    ///
    /// The pattern must be anchored (`^...$`); matching is case-sensitive.
    pub fn allowed_origin_pattern(mut self, pattern: &str) -> Self {
        self.allowed_origin_pattern = pattern.to_string();
        self
    }

    /// Set the origin echoed for requests whose origin is not allowed
    pub fn fallback_origin(mut self, origin: &str) -> Self {
        self.fallback_origin = origin.to_string();
        self
    }

    /// Set the value list of `Access-Control-Allow-Headers`
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Set the value list of `Access-Control-Allow-Methods`
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.allowed_methods = methods.to_vec();
        self
    }

    /// Build the origin policy
    ///
    /// # Errors
    ///
    /// - `InvalidOriginPattern` if the pattern does not compile
    /// - `UnanchoredOriginPattern` if it is missing `^` or `$`
    /// - `InvalidFallbackOrigin` if the fallback is not `scheme://host[:port]`
    pub fn build(self) -> Result<OriginPolicy, CorsConfigError> {
        let pattern = self.allowed_origin_pattern;
        if !pattern.starts_with('^') || !pattern.ends_with('$') {
            return Err(CorsConfigError::UnanchoredOriginPattern { pattern });
        }
        let regex = Regex::new(&pattern).map_err(|e| CorsConfigError::InvalidOriginPattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;

        if !is_origin_shaped(&self.fallback_origin) {
            return Err(CorsConfigError::InvalidFallbackOrigin {
                origin: self.fallback_origin,
            });
        }

        Ok(OriginPolicy {
            pattern: regex,
            fallback_origin: self.fallback_origin,
            allow_headers: self.allowed_headers.join(","),
            allow_methods: self
                .allowed_methods
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(","),
        })
    }
}

impl Default for OriginPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `scheme://host[:port]` with no path, query or fragment
fn is_origin_shaped(origin: &str) -> bool {
    match origin.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && !rest.is_empty()
                && !rest.contains(['/', '?', '#'])
                && !rest.starts_with(':')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let policy = OriginPolicyBuilder::new().build().unwrap();
        assert_eq!(policy.allow_methods, "POST,OPTIONS");
        assert_eq!(
            policy.allow_headers,
            "Content-Type,Authorization,X-Amz-Date,X-Api-Key,X-Amz-Security-Token"
        );
        assert_eq!(policy.fallback_origin(), "https://api.testdevops.com");
    }

    #[test]
    fn test_rejects_invalid_regex() {
        let err = OriginPolicyBuilder::new()
            .allowed_origin_pattern("^https://(unclosed$")
            .build()
            .unwrap_err();
        assert!(matches!(err, CorsConfigError::InvalidOriginPattern { .. }));
    }

    #[test]
    fn test_rejects_unanchored_pattern() {
        let err = OriginPolicyBuilder::new()
            .allowed_origin_pattern(r"https://.*\.example\.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, CorsConfigError::UnanchoredOriginPattern { .. }));
    }

    #[test]
    fn test_rejects_fallback_with_path() {
        let err = OriginPolicyBuilder::new()
            .fallback_origin("https://api.testdevops.com/reviews")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CorsConfigError::InvalidFallbackOrigin {
                origin: "https://api.testdevops.com/reviews".into()
            }
        );
    }

    #[test]
    fn test_origin_shape() {
        assert!(is_origin_shaped("https://example.com"));
        assert!(is_origin_shaped("http://localhost:3000"));
        assert!(!is_origin_shaped("example.com"));
        assert!(!is_origin_shaped("https://"));
        assert!(!is_origin_shaped("https://example.com?x=1"));
    }
}
