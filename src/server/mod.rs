//! # Server Module
//!
//! Request and response types, the review pipeline and its HTTP front end.
//!
//! - [`ReviewService`] runs one [`ReviewRequest`] through the pipeline and
//!   returns a [`ResponseEnvelope`]. It knows nothing about transports.
//! - [`HttpServer`] serves the pipeline over HTTP on a pool of worker threads.
//! - The CLI's `invoke` command feeds it gateway proxy events instead.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{RequestBody, ReviewRequest};
pub use response::{build_response, HeaderVec, ResponseEnvelope};
pub use service::ReviewService;
