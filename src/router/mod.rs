//! Request routing: map page paths and methods to handlers.
//!
//! | Pattern | Example match | Captured params |
//! |---|---|---|
//! | `/leaderboard` | `/leaderboard` | *(none)* |
//! | `/stocks/:tickerID/options/unusual-activity` | `/stocks/TSLA/options/unusual-activity` | `tickerID → "TSLA"` |
//!
//! Captured values are percent-decoded (`%5EGSPC` → `^GSPC`); case is kept.
//! Trailing slashes are ignored on both sides. Routes are tried in
//! registration order and the first match wins. A path that matches only
//! under another method answers `405`; no match at all answers `404`.

use std::pin::Pin;
use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::context::{Context, RouteParams};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased async handler stored by the router.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Any `Fn(Context) -> impl Future<Output = Response>` that can be shared
/// across tasks.
pub trait IntoHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Static(String),
    Parameter(String),
}

/// Compiled route pattern: a list of literal and `:name` segments.
#[derive(Debug, Clone)]
struct Pattern {
    segments: Vec<Segment>,
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let segments = split(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Parameter(name.to_owned()),
                None => Segment::Static(s.to_owned()),
            })
            .collect();
        Self { segments }
    }

    fn matches(&self, path: &str) -> Option<RouteParams> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Parameter(name) => {
                    let value = percent_decode_str(part).decode_utf8_lossy();
                    params.insert(name.as_str(), value.into_owned());
                }
            }
        }
        Some(params)
    }
}

struct Route {
    method: Method,
    path: String,
    pattern: Pattern,
    handler: Handler,
}

/// Dispatches requests to the first route whose method and pattern match.
///
/// ```rust,no_run
/// use pagedata::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
/// router.get("/stocks/:tickerID/options/unusual-activity", |ctx: pagedata::context::Context| async move {
///     let ticker = ctx.params().get("tickerID").unwrap_or_default().to_owned();
///     Response::new(StatusCode::Ok).body(ticker)
/// });
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, handler);
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        let handler: Handler = Arc::new(move |ctx| handler.call(ctx));
        self.routes.push(Route {
            method,
            path: path.to_owned(),
            pattern: Pattern::parse(path),
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered `(method, pattern)` pairs in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.path.as_str()))
    }

    /// Runs the matching handler, or answers `405`/`404`.
    pub async fn route(&self, request: Request) -> Response {
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(request.path()) else {
                continue;
            };
            if &route.method == request.method() {
                let ctx = Context::with_params(request, params);
                return (route.handler)(ctx).await;
            }
            path_matched = true;
        }

        if path_matched {
            Response::new(StatusCode::MethodNotAllowed)
        } else {
            Response::new(StatusCode::NotFound)
        }
    }
}
