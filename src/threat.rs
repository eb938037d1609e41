//! # Threat Filter
//!
//! Best-effort denylist scan of review fields for well-known injection
//! payloads. This is a tripwire, not a sanitizer: it looks for substrings that
//! have no business in an app review and reports which field contained one.
//!
//! Patterns are compiled once into an ordered list of [`PatternMatcher`]s and
//! evaluated independently; a field is flagged as soon as any pattern matches.
//!
//! | # | Pattern | Catches |
//! |---|---------|---------|
//! | 1 | `<script.*?>.*?</script.*?>` | script-tag injection |
//! | 2 | `;`, `\|\|`, `&&`, `$(`, backtick, `DROP`/`DELETE`/`INSERT`/`UPDATE`/`SELECT`/`UNION` | SQL / command injection |
//! | 3 | `../` | path traversal |
//! | 4 | `${...}` | template injection |
//! | 5 | `{$...}` | alternate template / NoSQL operator injection |
//!
//! All patterns match case-insensitively.

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use thiserror::Error;

/// Built-in denylist, in evaluation order.
pub const DEFAULT_THREAT_PATTERNS: &[&str] = &[
    r"<script.*?>.*?</script.*?>",
    r"(;|\|\||&&|\$\(|`|\bDROP\b|\bDELETE\b|\bINSERT\b|\bUPDATE\b|\bSELECT\b|\bUNION\b)",
    r"\.\./",
    r"\$\{.*?\}",
    r"\{\$.*?\}",
];

/// A denylist pattern failed to compile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid threat pattern '{pattern}': {reason}")]
pub struct ThreatPatternError {
    /// The offending pattern
    pub pattern: String,
    /// Compiler message from `regex`
    pub reason: String,
}

/// Anything that can decide whether a piece of text looks malicious.
pub trait PatternMatcher: Send + Sync {
    /// `true` when `text` contains the pattern.
    fn matches(&self, text: &str) -> bool;
}

impl PatternMatcher for Regex {
    fn matches(&self, text: &str) -> bool {
        self.is_match(text)
    }
}

/// Ordered set of precompiled matchers.
pub struct ThreatFilter {
    matchers: Vec<Box<dyn PatternMatcher>>,
}

impl std::fmt::Debug for ThreatFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreatFilter")
            .field("matchers", &self.matchers.len())
            .finish()
    }
}

impl ThreatFilter {
    /// Compile case-insensitive regex matchers from `patterns`, keeping order.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ThreatPatternError> {
        let matchers = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map(|re| Box::new(re) as Box<dyn PatternMatcher>)
                    .map_err(|e| ThreatPatternError {
                        pattern: p.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matchers })
    }

    /// Build a filter from arbitrary matchers.
    pub fn with_matchers(matchers: Vec<Box<dyn PatternMatcher>>) -> Self {
        Self { matchers }
    }

    /// Number of matchers in the filter
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Whether the filter has no matchers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Whether any matcher fires on `text`.
    #[must_use]
    pub fn is_malicious(&self, text: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(text))
    }

    /// Whether a JSON value is a string that trips the filter.
    ///
    /// Numbers, booleans, objects, arrays and absent values never match.
    #[must_use]
    pub fn is_malicious_value(&self, value: Option<&Value>) -> bool {
        match value {
            Some(Value::String(s)) => self.is_malicious(s),
            _ => false,
        }
    }

    /// Scan the review fields of a request body.
    ///
    /// `AppName` and `Description` are always scanned; `Rating` only when it was
    /// sent as a string. Returns one message per flagged field, in the order
    /// `AppName`, `Description`, `Rating`.
    #[must_use]
    pub fn scan_review(&self, body: &serde_json::Map<String, Value>) -> Vec<String> {
        let mut findings = Vec::new();
        for field in ["AppName", "Description"] {
            if self.is_malicious_value(body.get(field)) {
                findings.push(malicious_message(field));
            }
        }
        if let Some(Value::String(rating)) = body.get("Rating") {
            if self.is_malicious(rating) {
                findings.push(malicious_message("Rating"));
            }
        }
        findings
    }
}

impl Default for ThreatFilter {
    fn default() -> Self {
        // The built-in denylist is covered by the tests below.
        #[allow(clippy::expect_used)]
        Self::from_patterns(DEFAULT_THREAT_PATTERNS).expect("built-in threat patterns compile")
    }
}

fn malicious_message(field: &str) -> String {
    format!("Malicious content detected in {field}.")
}
