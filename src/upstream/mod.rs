//! Outbound calls to the financial-data API and the internal service.
//!
//! Loaders describe a call as an [`UpstreamRequest`] and hand it to a
//! [`Fetcher`], which sends it through an [`UpstreamClient`], applies the
//! configured [`StatusPolicy`] and parses the body as JSON.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::http::Headers;

mod http_client;

pub use http_client::HttpUpstream;

/// Header carrying the API key on calls to the financial-data API.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// The two verbs loaders call upstream with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMethod {
    Get,
    Post,
}

impl UpstreamMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for UpstreamMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound call. Built fresh per load and consumed by the send.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: UpstreamMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    fn new(method: UpstreamMethod, base: &str, path: &str) -> Self {
        let mut headers = Headers::with_capacity(2);
        headers.insert("Content-Type", "application/json");
        Self {
            method,
            url: format!("{base}{path}"),
            headers,
            body: None,
        }
    }

    /// `GET {base}{path}` with a JSON content type.
    pub fn get(base: &str, path: &str) -> Self {
        Self::new(UpstreamMethod::Get, base, path)
    }

    /// `POST {base}{path}` with a JSON content type.
    pub fn post(base: &str, path: &str) -> Self {
        Self::new(UpstreamMethod::Post, base, path)
    }

    #[must_use]
    pub fn api_key(mut self, key: &str) -> Self {
        self.headers.insert(API_KEY_HEADER, key);
        self
    }

    /// Serializes `body` as the JSON payload.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, LoadError> {
        self.body = Some(serde_json::to_value(body).map_err(LoadError::Encode)?);
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport for upstream calls.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, LoadError>;
}

/// What to do with a non-2xx upstream status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Parse and return the body whatever the status.
    #[default]
    PassThrough,
    /// Fail with [`LoadError::Upstream`] on anything outside 2xx.
    Strict,
}

impl std::str::FromStr for StatusPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" | "pass-through" => Ok(Self::PassThrough),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown status policy `{other}`")),
        }
    }
}

/// Sends requests and turns responses into JSON values.
#[derive(Clone)]
pub struct Fetcher {
    client: Arc<dyn UpstreamClient>,
    policy: StatusPolicy,
}

impl Fetcher {
    pub fn new(client: Arc<dyn UpstreamClient>, policy: StatusPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    pub async fn fetch_json(&self, request: UpstreamRequest) -> Result<Value, LoadError> {
        let url = request.url.clone();
        let method = request.method;
        let start = Instant::now();

        let response = self.client.send(request).await?;
        debug!(
            %method,
            %url,
            status = response.status,
            bytes = response.body.len(),
            elapsed = ?start.elapsed(),
            "upstream responded"
        );

        if self.policy == StatusPolicy::Strict && !response.is_success() {
            return Err(LoadError::Upstream {
                url,
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        serde_json::from_slice(&response.body).map_err(|source| LoadError::Parse { url, source })
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubUpstream;
    use super::*;
    use serde_json::json;

    #[test]
    fn request_builder_sets_json_and_key_headers() {
        let req = UpstreamRequest::post("http://api", "/list-category")
            .api_key("k-123")
            .json(&json!({"filterList": "hottest-contracts"}))
            .unwrap();
        assert_eq!(req.method, UpstreamMethod::Post);
        assert_eq!(req.method.to_string(), "POST");
        assert_eq!(req.url, "http://api/list-category");
        assert_eq!(req.headers.get("content-type"), Some("application/json"));
        assert_eq!(req.headers.get("x-api-key"), Some("k-123"));
        assert_eq!(req.body, Some(json!({"filterList": "hottest-contracts"})));
    }

    #[test]
    fn status_policy_parses() {
        assert_eq!("strict".parse::<StatusPolicy>(), Ok(StatusPolicy::Strict));
        assert_eq!(
            "PassThrough".parse::<StatusPolicy>(),
            Ok(StatusPolicy::PassThrough)
        );
        assert!("lenient".parse::<StatusPolicy>().is_err());
    }

    #[tokio::test]
    async fn pass_through_returns_error_bodies_as_data() {
        let stub = StubUpstream::raw(500, r#"{"error":"boom"}"#);
        let fetcher = Fetcher::new(stub.clone(), StatusPolicy::PassThrough);
        let value = fetcher
            .fetch_json(UpstreamRequest::get("http://api", "/sector-overview"))
            .await
            .unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn strict_rejects_non_success() {
        let stub = StubUpstream::raw(401, r#"{"error":"bad key"}"#);
        let fetcher = Fetcher::new(stub.clone(), StatusPolicy::Strict);
        let err = fetcher
            .fetch_json(UpstreamRequest::get("http://api", "/sector-overview"))
            .await
            .unwrap_err();
        match err {
            LoadError::Upstream { status, body, url } => {
                assert_eq!(status, 401);
                assert_eq!(body, r#"{"error":"bad key"}"#);
                assert_eq!(url, "http://api/sector-overview");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_a_parse_error() {
        let stub = StubUpstream::raw(200, "<html>maintenance</html>");
        let err = stub::fetcher(&stub)
            .fetch_json(UpstreamRequest::get("http://api", "/economic-indicator"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
