//! # CLI Module
//!
//! Command-line entry points for the review endpoint.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Serve the pipeline over HTTP until SIGINT or SIGTERM:
//!
//! ```bash
//! REVIEW_TABLE_NAME=Reviews \
//! TOKEN_VALIDATION_ENDPOINT=https://auth.example.com/validate \
//!     review-gate serve --bind 0.0.0.0:8080 --workers 8
//! ```
//!
//! ### `invoke`
//!
//! Run a single gateway proxy event and print the proxy result:
//!
//! ```bash
//! echo '{"httpMethod":"OPTIONS","headers":{"Origin":"https://app.testdevops.com"}}' \
//!     | review-gate --table Reviews --token-endpoint http://localhost:9000 invoke
//! ```
//!
//! Every setting can be passed as a flag or through its environment variable;
//! flags win.

mod commands;


pub use commands::{run, run_cli, Cli, Commands, ConfigArgs};
