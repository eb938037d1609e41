use serde_json::{json, Map, Value};
use smallvec::SmallVec;

use crate::cors::OriginPolicy;
use crate::error::PipelineError;

/// Response headers. Four CORS/content headers always fit inline.
pub type HeaderVec = SmallVec<[(&'static str, String); 8]>;

/// Transport-neutral response produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: HeaderVec,
    pub body: Value,
}

impl ResponseEnvelope {
    /// Look up a header by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialized body bytes
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }

    /// Render as a gateway proxy result: `{statusCode, headers, body}` where
    /// `body` is the JSON body encoded as a string.
    pub fn to_event_json(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
            .collect();
        json!({
            "statusCode": self.status_code,
            "headers": headers,
            "body": self.body.to_string(),
        })
    }
}

/// Build a response carrying the standard CORS and content headers.
///
/// Every response the pipeline produces goes through here.
pub fn build_response(
    policy: &OriginPolicy,
    status_code: u16,
    body: Value,
    origin: Option<&str>,
) -> ResponseEnvelope {
    let mut headers = HeaderVec::new();
    policy.apply_headers(&mut headers, origin);
    ResponseEnvelope {
        status_code,
        headers,
        body,
    }
}

/// Build the response for a pipeline failure.
pub fn error_response(
    policy: &OriginPolicy,
    err: &PipelineError,
    origin: Option<&str>,
) -> ResponseEnvelope {
    build_response(policy, err.status_code(), err.body(), origin)
}
