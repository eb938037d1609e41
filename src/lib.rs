//! # review-gate
//!
//! **review-gate** is a synchronous request pipeline that accepts app reviews
//! over HTTP, checks them and stores them in a key-value table.
//!
//! ## Overview
//!
//! Each request is screened for origin (CORS), authenticated against a remote
//! token validation endpoint, validated field by field, scanned for injection
//! payloads and, when everything passes, written as one record keyed by
//! `(AppName, CreateDate)`. Every outcome is returned as a JSON response that
//! carries the same CORS headers.
//!
//! ## Architecture
//!
//! - **[`config`]** - Environment configuration, loaded once
//! - **[`cors`]** - Origin allow-list, preflight handling and CORS headers
//! - **[`security`]** - Credential extraction and token validation
//! - **[`validator`]** - Per-field JSON Schema checks
//! - **[`threat`]** - Denylist scan for injection payloads
//! - **[`store`]** - Review table backends (in-memory, JSON lines)
//! - **[`server`]** - The pipeline itself and its HTTP front end
//! - **[`logging`]** - `tracing` subscriber set-up
//! - **[`cli`]** - `serve` and `invoke` commands
//!
//! ### Request Flow
//!
//! ```text
//! request
//!   → configuration check      (400 when the table or validator is unset)
//!   → OPTIONS?  preflight      (200 / 403, stops here)
//!   → origin check             (403)
//!   → auth gate                (401)
//!   → JSON body                (400 "Invalid JSON format.")
//!   → schema + threat checks   (400 with every message)
//!   → store write              (500 on failure)
//!   → 201 {"message", "reviewId": "<AppName>#<CreateDate>"}
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use review_gate::config::ServiceConfig;
//! use review_gate::server::{ReviewRequest, ReviewService};
//! use review_gate::store::MemoryReviewStore;
//!
//! let config = ServiceConfig {
//!     table_name: Some("Reviews".into()),
//!     token_validation_endpoint: Some("http://auth.local/validate".into()),
//!     ..ServiceConfig::default()
//! };
//! let store = Arc::new(MemoryReviewStore::new("Reviews"));
//! let service = ReviewService::new(config, store)
//!     .unwrap()
//!     .with_token_validator(Arc::new(|token: &str| token == "Bearer ok"));
//!
//! let resp = service.handle(
//!     &ReviewRequest::new("POST")
//!         .header("Origin", "https://app.testdevops.com")
//!         .header("Authorization", "Bearer ok")
//!         .body(r#"{"AppName":"Foo","Rating":5,"Description":"Great app"}"#),
//! );
//! assert_eq!(resp.status_code, 201);
//! ```

pub mod cli;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod security;
pub mod server;
pub mod store;
pub mod threat;
pub mod validator;

pub use config::ServiceConfig;
pub use error::PipelineError;
pub use server::{ResponseEnvelope, ReviewRequest, ReviewService};
