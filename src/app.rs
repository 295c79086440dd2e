//! Page server wiring: every loader mounted under its page route.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::cache::{MemoryCache, PageCache};
use crate::config::Config;
use crate::context::{Context, Locals, PageRequest, ResponseHeaders};
use crate::http::{Response, StatusCode};
use crate::loaders::{
    CacheHeaderStyle, Leaderboard, ListCategory, MarketSnapshot, PageLoader, UnusualActivity,
};
use crate::router::Router;
use crate::upstream::{Fetcher, HttpUpstream, StatusPolicy, UpstreamClient};

/// The set of page loaders plus the locals injected into each request.
pub struct PageApp {
    locals: Arc<Locals>,
    loaders: Vec<Arc<dyn PageLoader>>,
}

impl PageApp {
    pub fn new(locals: Locals) -> Self {
        Self {
            locals: Arc::new(locals),
            loaders: Vec::new(),
        }
    }

    /// All six pages over a reqwest client and an in-memory leaderboard cache.
    pub fn from_config(config: &Config) -> Self {
        let cache = Arc::new(MemoryCache::new(config.leaderboard_ttl));
        Self::with_parts(
            config.locals.clone(),
            Arc::new(HttpUpstream::new()),
            cache,
            config.status_policy,
            config.cache_header_style,
        )
    }

    /// All six pages over the given upstream client and cache.
    pub fn with_parts(
        locals: Locals,
        client: Arc<dyn UpstreamClient>,
        cache: Arc<dyn PageCache>,
        policy: StatusPolicy,
        style: CacheHeaderStyle,
    ) -> Self {
        let fetcher = Fetcher::new(client, policy);
        Self::new(locals)
            .mount(MarketSnapshot::economic_indicator(fetcher.clone()))
            .mount(MarketSnapshot::sector_overview(fetcher.clone()))
            .mount(Leaderboard::new(fetcher.clone(), cache))
            .mount(ListCategory::hottest_contracts(fetcher.clone()))
            .mount(ListCategory::overbought_stocks(fetcher.clone(), style))
            .mount(UnusualActivity::new(fetcher))
    }

    #[must_use]
    pub fn mount(mut self, loader: impl PageLoader + 'static) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    pub fn loaders(&self) -> &[Arc<dyn PageLoader>] {
        &self.loaders
    }

    /// Registers a `GET` route per loader.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for loader in &self.loaders {
            let loader = Arc::clone(loader);
            let locals = Arc::clone(&self.locals);
            router.get(loader.route(), move |ctx: Context| {
                let loader = Arc::clone(&loader);
                let locals = Arc::clone(&locals);
                async move { render(loader.as_ref(), &locals, ctx).await }
            });
        }
        router
    }
}

/// Runs one loader for one page request and turns the outcome into a response.
pub async fn render(loader: &dyn PageLoader, locals: &Locals, ctx: Context) -> Response {
    let path = ctx.request().path().to_owned();
    let request = PageRequest::new(locals.clone(), ctx.into_params());
    let mut headers = ResponseHeaders::new();

    match loader.load(&request, &mut headers).await {
        Ok(data) => {
            debug!(path = %path, field = data.field, "page data loaded");
            let mut response = Response::new(StatusCode::Ok).json(&data);
            headers.apply(&mut response);
            response
        }
        Err(e) => {
            let status = e.status();
            warn!(path = %path, field = loader.field(), error = %e, "page load failed");
            Response::new(status).json(&json!({ "error": e.to_string() }))
        }
    }
}
