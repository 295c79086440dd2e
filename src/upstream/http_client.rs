use async_trait::async_trait;

use super::{UpstreamClient, UpstreamMethod, UpstreamRequest, UpstreamResponse};
use crate::error::LoadError;

/// [`UpstreamClient`] over a shared [`reqwest::Client`].
///
/// No timeout or retry is configured here; the call lives as long as the
/// client's defaults allow.
#[derive(Clone, Default)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: UpstreamMethod) -> reqwest::Method {
    match method {
        UpstreamMethod::Get => reqwest::Method::GET,
        UpstreamMethod::Post => reqwest::Method::POST,
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, LoadError> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body).map_err(LoadError::Encode)?);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(UpstreamResponse { status, body })
    }
}
