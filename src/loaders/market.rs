use async_trait::async_trait;

use super::{CACHE_CONTROL, PageData, PageLoader};
use crate::context::{PageRequest, ResponseHeaders};
use crate::error::LoadError;
use crate::upstream::{Fetcher, UpstreamRequest};

const FIFTY_MINUTES: &str = "public, max-age=3000";

/// A `GET` of a market-wide dataset from the API, cacheable downstream for
/// fifty minutes.
pub struct MarketSnapshot {
    fetcher: Fetcher,
    route: &'static str,
    endpoint: &'static str,
    field: &'static str,
}

impl MarketSnapshot {
    pub fn economic_indicator(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            route: "/economic-indicator",
            endpoint: "/economic-indicator",
            field: "getEconomicIndicator",
        }
    }

    pub fn sector_overview(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            route: "/industry/sectors",
            endpoint: "/sector-overview",
            field: "getSectorOverview",
        }
    }
}

#[async_trait]
impl PageLoader for MarketSnapshot {
    fn route(&self) -> &'static str {
        self.route
    }

    fn field(&self) -> &'static str {
        self.field
    }

    async fn load(
        &self,
        request: &PageRequest,
        headers: &mut ResponseHeaders,
    ) -> Result<PageData, LoadError> {
        let locals = &request.locals;
        let call = UpstreamRequest::get(locals.require_api_url()?, self.endpoint)
            .api_key(locals.require_api_key()?);

        let output = self.fetcher.fetch_json(call).await?;
        headers.set(CACHE_CONTROL, FIFTY_MINUTES);

        Ok(PageData::new(self.field, output))
    }
}
