use async_trait::async_trait;
use serde::Serialize;

use super::{CACHE_CONTROL, CacheHeaderStyle, PageData, PageLoader};
use crate::context::{PageRequest, ResponseHeaders};
use crate::error::LoadError;
use crate::upstream::{Fetcher, UpstreamRequest};

#[derive(Serialize)]
struct ListQuery<'a> {
    #[serde(rename = "filterList")]
    filter_list: &'a str,
}

/// A named stock list served by `POST /list-category`.
pub struct ListCategory {
    fetcher: Fetcher,
    route: &'static str,
    filter: &'static str,
    field: &'static str,
    cache_control: Option<&'static str>,
}

impl ListCategory {
    pub fn hottest_contracts(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            route: "/list/hottest-contracts",
            filter: "hottest-contracts",
            field: "getStocks",
            cache_control: None,
        }
    }

    pub fn overbought_stocks(fetcher: Fetcher, style: CacheHeaderStyle) -> Self {
        Self {
            fetcher,
            route: "/list/overbought-stocks",
            filter: "overbought-stocks",
            field: "getOverBoughtStocks",
            cache_control: Some(style.five_minutes()),
        }
    }

    pub fn filter(&self) -> &'static str {
        self.filter
    }
}

#[async_trait]
impl PageLoader for ListCategory {
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
        let call = UpstreamRequest::post(locals.require_api_url()?, "/list-category")
            .api_key(locals.require_api_key()?)
            .json(&ListQuery {
                filter_list: self.filter,
            })?;

        let output = self.fetcher.fetch_json(call).await?;
        if let Some(value) = self.cache_control {
            headers.set(CACHE_CONTROL, value);
        }

        Ok(PageData::new(self.field, output))
    }
}
