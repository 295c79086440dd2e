//! Per-request context: the locals a host injects, captured route
//! parameters, and the response headers a loader asks for.

use std::collections::HashMap;

use crate::error::LoadError;
use crate::http::{Headers, Request, Response};

/// Values the host injects into every page request.
#[derive(Debug, Clone, Default)]
pub struct Locals {
    pub api_key: String,
    /// Base URL of the financial-data API.
    pub api_url: String,
    /// Base URL of the internal service.
    pub fastify_url: String,
    /// Opaque identity of the signed-in user, if any.
    pub user: Option<String>,
}

impl Locals {
    pub fn require_api_key(&self) -> Result<&str, LoadError> {
        non_empty(&self.api_key, "apiKey")
    }

    pub fn require_api_url(&self) -> Result<&str, LoadError> {
        non_empty(&self.api_url, "apiURL")
    }

    pub fn require_fastify_url(&self) -> Result<&str, LoadError> {
        non_empty(&self.fastify_url, "fastifyURL")
    }
}

fn non_empty<'a>(value: &'a str, name: &'static str) -> Result<&'a str, LoadError> {
    if value.is_empty() {
        Err(LoadError::Context(name))
    } else {
        Ok(value)
    }
}

/// Path parameters captured by the matched route.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    map: HashMap<String, String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get) but fails with [`LoadError::MissingParam`].
    pub fn require(&self, key: &'static str) -> Result<&str, LoadError> {
        self.get(key).ok_or(LoadError::MissingParam { name: key })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Everything a loader may read about the page request. Loaders only ever
/// borrow it.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub locals: Locals,
    pub params: RouteParams,
}

impl PageRequest {
    pub fn new(locals: Locals, params: RouteParams) -> Self {
        Self { locals, params }
    }
}

/// Headers a loader wants on the page response. Setting a name twice keeps
/// the last value.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeaders {
    inner: Headers,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.inner.set(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Copies every header onto `response`.
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.inner.iter() {
            response.set_header(name, value);
        }
    }
}

/// What a router handler receives: the raw request plus captured params.
pub struct Context {
    request: Request,
    params: RouteParams,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self::with_params(request, RouteParams::new())
    }

    pub fn with_params(request: Request, params: RouteParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    pub fn into_params(self) -> RouteParams {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;

    #[test]
    fn empty_locals_are_rejected_by_name() {
        let locals = Locals {
            api_url: "http://api".into(),
            ..Locals::default()
        };
        assert_eq!(locals.require_api_url().unwrap(), "http://api");
        assert!(matches!(
            locals.require_api_key(),
            Err(LoadError::Context("apiKey"))
        ));
        assert!(matches!(
            locals.require_fastify_url(),
            Err(LoadError::Context("fastifyURL"))
        ));
    }

    #[test]
    fn route_params_require() {
        let params: RouteParams = [("tickerID", "nvda")].into_iter().collect();
        assert_eq!(params.require("tickerID").unwrap(), "nvda");
        assert!(matches!(
            params.require("symbol"),
            Err(LoadError::MissingParam { name: "symbol" })
        ));
    }

    #[test]
    fn response_headers_last_write_wins() {
        let mut headers = ResponseHeaders::new();
        headers.set("cache-control", "no-store");
        headers.set("Cache-Control", "public, max-age=3000");

        let mut response = Response::new(StatusCode::Ok);
        headers.apply(&mut response);
        assert_eq!(
            response.headers().get("cache-control"),
            Some("public, max-age=3000")
        );
        assert_eq!(response.headers().len(), 1);
    }
}
