use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use super::request::{RequestBody, ReviewRequest};
use super::response::{build_response, error_response, ResponseEnvelope};
use crate::config::ServiceConfig;
use crate::cors::{OriginPolicy, OriginPolicyBuilder};
use crate::error::PipelineError;
use crate::security::{authorize, RemoteTokenValidator, SecurityRequest, TokenValidator};
use crate::store::{FileReviewStore, MemoryReviewStore, ReviewRecord, ReviewStore};
use crate::threat::ThreatFilter;
use crate::validator::ReviewSchema;

/// Success message for an accepted preflight
pub const PREFLIGHT_OK: &str = "CORS preflight check successful";
/// Success message for a stored review
pub const REVIEW_SUBMITTED: &str = "Review submitted successfully";

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The review submission pipeline.
///
/// Holds the immutable configuration, the precompiled origin policy, schema
/// and threat matchers, the token validator and the store handle. Cloning is
/// cheap and every clone shares the same state, so one service can be handed
/// to each worker thread.
#[derive(Clone)]
pub struct ReviewService {
    config: Arc<ServiceConfig>,
    policy: Arc<OriginPolicy>,
    schema: ReviewSchema,
    threats: Arc<ThreatFilter>,
    validator: Option<Arc<dyn TokenValidator>>,
    store: Arc<dyn ReviewStore>,
    clock: Clock,
}

impl fmt::Debug for ReviewService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewService")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("schema", &self.schema)
            .field("threats", &self.threats)
            .field("validator", &self.validator.is_some())
            .field("table", &self.store.table_name())
            .finish()
    }
}

impl ReviewService {
    /// Assemble a service from configuration.
    ///
    /// The token validator is the remote endpoint when one is configured. The
    /// store is file-backed when `data_dir` is set, in-memory otherwise.
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let table = config.table_name.clone().unwrap_or_default();
        let store: Arc<dyn ReviewStore> = match (&config.data_dir, config.table_name.is_some()) {
            (Some(dir), true) => Arc::new(
                FileReviewStore::open(dir, &table)
                    .with_context(|| format!("Failed to open review table in {}", dir.display()))?,
            ),
            _ => Arc::new(MemoryReviewStore::new(table)),
        };
        let validator = config.token_validation_endpoint.as_ref().map(|endpoint| {
            Arc::new(RemoteTokenValidator::new(endpoint).timeout(config.token_timeout))
                as Arc<dyn TokenValidator>
        });

        let mut service = Self::new(config, store)?;
        service.validator = validator;
        Ok(service)
    }

    /// Assemble a service around an explicit store, with no token validator.
    pub fn new(config: ServiceConfig, store: Arc<dyn ReviewStore>) -> Result<Self> {
        let policy = OriginPolicyBuilder::from_config(&config)
            .build()
            .context("Invalid CORS origin configuration")?;
        let schema = ReviewSchema::compile().context("Failed to compile review schema")?;
        Ok(Self {
            config: Arc::new(config),
            policy: Arc::new(policy),
            schema,
            threats: Arc::new(ThreatFilter::default()),
            validator: None,
            store,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the token validator
    pub fn with_token_validator(mut self, validator: Arc<dyn TokenValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Replace the origin policy
    pub fn with_origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Replace the threat filter
    pub fn with_threat_filter(mut self, threats: ThreatFilter) -> Self {
        self.threats = Arc::new(threats);
        self
    }

    /// Replace the clock used to stamp `CreateDate`
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ReviewStore> {
        &self.store
    }

    /// Run one request through the pipeline.
    ///
    /// Never fails: every outcome, including configuration errors, is a
    /// complete response envelope with CORS headers.
    pub fn handle(&self, req: &ReviewRequest) -> ResponseEnvelope {
        let origin = req.origin();
        debug!(
            method = %req.method,
            has_origin = origin.is_some(),
            has_body = req.body.is_some(),
            "Received review request"
        );
        match self.run(req) {
            Ok((status, body)) => build_response(&self.policy, status, body, origin),
            Err(err) => error_response(&self.policy, &err, origin),
        }
    }

    fn run(&self, req: &ReviewRequest) -> Result<(u16, Value), PipelineError> {
        let origin = req.origin();

        if let Err(e) = self.config.require() {
            error!(error = %e, "Service is not configured");
            return Err(PipelineError::Configuration(e.to_string()));
        }

        if req.is_preflight() {
            self.policy.preflight(origin)?;
            info!("Handled CORS preflight request");
            return Ok((200, json!({ "message": PREFLIGHT_OK })));
        }

        self.policy.check(origin)?;

        authorize(&SecurityRequest::new(&req.headers), self.validator.as_deref())?;

        let body = parse_body(req.body.as_ref())?;

        let mut messages = self.schema.validate(&body);
        messages.extend(self.threats.scan_review(&body));
        if !messages.is_empty() {
            error!(errors = ?messages, "Review validation failed");
            return Err(PipelineError::ValidationFailed(messages));
        }
        info!("Review validation successful");

        let record = self.record_from(&body);
        if let Err(e) = self.store.put_review(&record) {
            error!(
                error = %e,
                table = self.store.table_name(),
                "Failed to save review"
            );
            return Err(PipelineError::PersistenceFailure);
        }
        let review_id = record.review_id();
        info!(review_id = %review_id, "Review saved");

        Ok((
            201,
            json!({ "message": REVIEW_SUBMITTED, "reviewId": review_id }),
        ))
    }

    fn record_from(&self, body: &Map<String, Value>) -> ReviewRecord {
        // Field shapes were checked by the schema.
        let text = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default();
        let rating = body.get("Rating").and_then(Value::as_f64).unwrap_or_default();
        ReviewRecord::new(text("AppName"), rating, text("Description"), (self.clock)())
    }
}

/// Parse the request body. An absent or `null` body is an empty object.
///
/// The bytes are decoded as they arrived; invalid UTF-8 is malformed JSON.
fn parse_body(body: Option<&RequestBody>) -> Result<Map<String, Value>, PipelineError> {
    let raw = match body {
        None => return Ok(Map::new()),
        Some(RequestBody::Bytes(raw)) => raw,
        Some(RequestBody::TooLarge { limit }) => {
            error!(limit, "Request body exceeds size limit");
            return Err(PipelineError::BodyMalformed);
        }
        Some(RequestBody::Unreadable) => {
            error!("Request body could not be read");
            return Err(PipelineError::BodyMalformed);
        }
    };
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => {
            error!("Request body is not a JSON object");
            Err(PipelineError::BodyMalformed)
        }
        Err(e) => {
            error!(error = %e, "Invalid JSON in request body");
            Err(PipelineError::BodyMalformed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(raw: &str) -> RequestBody {
        RequestBody::Bytes(raw.as_bytes().to_vec())
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body(None).unwrap().is_empty());
        assert!(parse_body(Some(&text("null"))).unwrap().is_empty());
        assert_eq!(parse_body(Some(&text("{bad"))), Err(PipelineError::BodyMalformed));
        assert_eq!(parse_body(Some(&text("[1,2]"))), Err(PipelineError::BodyMalformed));
        assert_eq!(parse_body(Some(&text("\"x\""))), Err(PipelineError::BodyMalformed));
        let map = parse_body(Some(&text(r#"{"AppName":"Foo"}"#))).unwrap();
        assert_eq!(map["AppName"], "Foo");
    }

    #[test]
    fn test_parse_body_rejects_invalid_utf8() {
        let mut raw = br#"{"AppName":"Foo","Rating":5,"Description":"bad "#.to_vec();
        raw.extend_from_slice(&[0xFF, 0xFE]);
        raw.extend_from_slice(br#""}"#);
        assert_eq!(
            parse_body(Some(&RequestBody::Bytes(raw))),
            Err(PipelineError::BodyMalformed)
        );
    }

    #[test]
    fn test_parse_body_rejects_incomplete_bodies() {
        assert_eq!(
            parse_body(Some(&RequestBody::TooLarge { limit: 16 })),
            Err(PipelineError::BodyMalformed)
        );
        assert_eq!(
            parse_body(Some(&RequestBody::Unreadable)),
            Err(PipelineError::BodyMalformed)
        );
    }

    #[test]
    fn test_unconfigured_service_rejects_everything() {
        let store = Arc::new(MemoryReviewStore::new(""));
        let service = ReviewService::new(ServiceConfig::default(), store).unwrap();
        let resp = service.handle(&ReviewRequest::new("OPTIONS"));
        assert_eq!(resp.status_code, 400);
        assert_eq!(
            resp.body["message"],
            "REVIEW_TABLE_NAME environment variable is required"
        );
        assert_eq!(resp.header("Access-Control-Allow-Methods"), Some("POST,OPTIONS"));
    }

    #[test]
    fn test_from_config_uses_memory_store_without_data_dir() {
        let config = ServiceConfig {
            table_name: Some("Reviews".into()),
            token_validation_endpoint: Some("http://127.0.0.1:9/validate".into()),
            ..ServiceConfig::default()
        };
        let service = ReviewService::from_config(config).unwrap();
        assert_eq!(service.store().table_name(), "Reviews");
        assert!(service.validator.is_some());
    }
}
