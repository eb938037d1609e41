use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Transport-neutral request handed to the pipeline.
///
/// Header names are kept exactly as received; lookups are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewRequest {
    #[serde(rename = "httpMethod", default)]
    pub method: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, deserialize_with = "text_body")]
    pub body: Option<RequestBody>,
}

/// Request body as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw bytes, decoded by the pipeline
    Bytes(Vec<u8>),
    /// Longer than the transport's limit; discarded unread
    TooLarge { limit: u64 },
    /// The transport failed while reading it
    Unreadable,
}

fn text_body<'de, D>(de: D) -> Result<Option<RequestBody>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.map(|s| RequestBody::Bytes(s.into_bytes())))
}

fn null_as_empty<'de, D>(de: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(de)?.unwrap_or_default())
}

impl ReviewRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Self::default()
        }
    }

    /// Add a header, replacing any previous value under the same exact name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Bytes(body.into().into_bytes()));
        self
    }

    /// Body bytes exactly as received, which need not be UTF-8
    pub fn raw_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes(body));
        self
    }

    /// Parse a gateway proxy event: `{"httpMethod", "headers", "body"}`.
    ///
    /// `headers` and `body` may be absent or `null`.
    pub fn from_event_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `Origin` header, matched exactly
    pub fn origin(&self) -> Option<&str> {
        self.headers.get("Origin").map(String::as_str)
    }

    /// Whether this is a CORS preflight. Methods are case-sensitive.
    pub fn is_preflight(&self) -> bool {
        self.method == "OPTIONS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_event_json() {
        let req = ReviewRequest::from_event_json(
            r#"{"httpMethod":"POST","headers":{"Origin":"https://app.testdevops.com"},"body":"{}"}"#,
        )
        .unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.origin(), Some("https://app.testdevops.com"));
        assert_eq!(req.body, Some(RequestBody::Bytes(b"{}".to_vec())));
        assert!(!req.is_preflight());
    }

    #[test]
    fn test_event_with_null_fields() {
        let req =
            ReviewRequest::from_event_json(r#"{"httpMethod":"OPTIONS","headers":null,"body":null}"#)
                .unwrap();
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
        assert!(req.is_preflight());
    }

    #[test]
    fn test_preflight_method_is_exact() {
        assert!(ReviewRequest::new("OPTIONS").is_preflight());
        assert!(!ReviewRequest::new("options").is_preflight());
        assert!(!ReviewRequest::from_event_json(r#"{"httpMethod":"Options"}"#)
            .unwrap()
            .is_preflight());
    }

    #[test]
    fn test_origin_lookup_is_exact() {
        let req = ReviewRequest::new("POST").header("origin", "https://app.testdevops.com");
        assert_eq!(req.origin(), None);
    }
}
