//! # Review Store
//!
//! The key-value store behind the endpoint. The pipeline only ever issues one
//! insert-or-overwrite per accepted review, keyed by `(AppName, CreateDate)`.
//!
//! Two backends are provided:
//!
//! - [`MemoryReviewStore`] keeps records in a concurrent map. Used when no data
//!   directory is configured, and in tests.
//! - [`FileReviewStore`] appends records to a JSON-lines file per table.
//!
//! Both are `Send + Sync` and are shared across request threads behind an
//! `Arc<dyn ReviewStore>`.

mod file;
mod memory;

pub use file::FileReviewStore;
pub use memory::MemoryReviewStore;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A persisted review.
///
/// Field names on the wire match the table's attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Partition key
    #[serde(rename = "AppName")]
    pub app_name: String,
    /// Sort key: ISO-8601 UTC instant with microsecond precision
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    /// Rating truncated to an integer
    #[serde(rename = "Rating")]
    pub rating: i64,
    /// Review text
    #[serde(rename = "Description")]
    pub description: String,
}

impl ReviewRecord {
    /// Build a record accepted at `now`.
    ///
    /// The rating's fractional part is dropped (`4.9` becomes `4`).
    pub fn new(
        app_name: impl Into<String>,
        rating: f64,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            create_date: format_create_date(now),
            rating: rating.trunc() as i64,
            description: description.into(),
        }
    }

    /// Identifier returned to the caller: `<AppName>#<CreateDate>`.
    #[must_use]
    pub fn review_id(&self) -> String {
        format!("{}#{}", self.app_name, self.create_date)
    }

    /// The `(AppName, CreateDate)` primary key
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.app_name, &self.create_date)
    }
}

/// Render a `CreateDate`, e.g. `2025-03-01T09:30:12.004512+00:00`.
#[must_use]
pub fn format_create_date(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Failures raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or read/written.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A record could not be encoded or decoded.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The backend refused the write (throttling, capacity, internal error).
    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Single-item key-value access to the reviews table.
pub trait ReviewStore: Send + Sync {
    /// Insert `record`, overwriting any record with the same key.
    fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError>;

    /// Fetch the record stored under `(app_name, create_date)`.
    fn get_review(
        &self,
        app_name: &str,
        create_date: &str,
    ) -> Result<Option<ReviewRecord>, StoreError>;

    /// Name of the backing table
    fn table_name(&self) -> &str;
}
