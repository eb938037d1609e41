//! # Review Schema Validator
//!
//! Field-level validation of a review submission.
//!
//! Each of the three fields is checked against its own precompiled JSON
//! Schema. Checks never short-circuit each other: every failing field
//! contributes exactly one message, in the order `AppName`, `Rating`,
//! `Description`.
//!
//! | Field | Schema |
//! |-------|--------|
//! | `AppName` | string, 1..=50 characters |
//! | `Rating` | number (integer or float), 1..=5 |
//! | `Description` | string, 1..=2000 characters |
//!
//! A missing field is validated as `null` and therefore fails. A rating sent as
//! a string (`"3"`) fails here even though the threat filter may accept it.
//! Lengths are counted in Unicode scalar values, as JSON Schema specifies.

use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Maximum `AppName` length in characters
pub const MAX_APP_NAME_LENGTH: usize = 50;
/// Maximum `Description` length in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
/// Inclusive rating bounds
pub const RATING_RANGE: (u8, u8) = (1, 5);

/// A field schema failed to compile.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid schema for {field}: {reason}")]
pub struct SchemaError {
    /// Field whose schema was rejected
    pub field: &'static str,
    /// Message from the schema compiler
    pub reason: String,
}

struct FieldRule {
    field: &'static str,
    validator: Validator,
    message: String,
}

/// Precompiled validators for the three review fields.
///
/// Compiled once at start-up; cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct ReviewSchema {
    rules: Arc<Vec<FieldRule>>,
}

impl std::fmt::Debug for ReviewSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewSchema")
            .field(
                "fields",
                &self.rules.iter().map(|r| r.field).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ReviewSchema {
    /// Compile the field schemas.
    pub fn compile() -> Result<Self, SchemaError> {
        let (min_rating, max_rating) = RATING_RANGE;
        let specs = [
            (
                "AppName",
                json!({ "type": "string", "minLength": 1, "maxLength": MAX_APP_NAME_LENGTH }),
                format!("AppName must be a string up to {MAX_APP_NAME_LENGTH} characters."),
            ),
            (
                "Rating",
                json!({ "type": "number", "minimum": min_rating, "maximum": max_rating }),
                format!("Rating must be a number between {min_rating} and {max_rating}."),
            ),
            (
                "Description",
                json!({ "type": "string", "minLength": 1, "maxLength": MAX_DESCRIPTION_LENGTH }),
                format!(
                    "Description must be a string up to {MAX_DESCRIPTION_LENGTH} characters."
                ),
            ),
        ];

        let rules = specs
            .into_iter()
            .map(|(field, schema, message)| {
                jsonschema::validator_for(&schema)
                    .map(|validator| FieldRule {
                        field,
                        validator,
                        message,
                    })
                    .map_err(|e| SchemaError {
                        field,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules: Arc::new(rules),
        })
    }

    /// Validate the review fields of a parsed body.
    ///
    /// Returns one message per failing field; empty means every field is valid.
    #[must_use]
    pub fn validate(&self, body: &Map<String, Value>) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| {
                let value = body.get(rule.field).unwrap_or(&Value::Null);
                !rule.validator.is_valid(value)
            })
            .map(|rule| rule.message.clone())
            .collect()
    }
}
