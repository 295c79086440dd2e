use async_trait::async_trait;
use serde::Serialize;

use super::{PageData, PageLoader};
use crate::context::{PageRequest, ResponseHeaders};
use crate::error::LoadError;
use crate::upstream::{Fetcher, UpstreamRequest};

pub const TICKER_PARAM: &str = "tickerID";

#[derive(Serialize)]
struct TickerQuery<'a> {
    ticker: &'a str,
}

/// Unusual options activity for the ticker in the route.
pub struct UnusualActivity {
    fetcher: Fetcher,
}

impl UnusualActivity {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PageLoader for UnusualActivity {
    fn route(&self) -> &'static str {
        "/stocks/:tickerID/options/unusual-activity"
    }

    fn field(&self) -> &'static str {
        "getData"
    }

    async fn load(
        &self,
        request: &PageRequest,
        _headers: &mut ResponseHeaders,
    ) -> Result<PageData, LoadError> {
        let locals = &request.locals;
        // Decoded by the router; case is left to the API.
        let ticker = request.params.require(TICKER_PARAM)?;
        let call = UpstreamRequest::post(locals.require_api_url()?, "/unusual-activity")
            .api_key(locals.require_api_key()?)
            .json(&TickerQuery { ticker })?;

        let output = self.fetcher.fetch_json(call).await?;
        Ok(PageData::new(self.field(), output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Locals, RouteParams};
    use crate::upstream::stub::{self, StubUpstream};
    use serde_json::json;

    fn page_request(params: RouteParams) -> PageRequest {
        PageRequest::new(
            Locals {
                api_key: "key".into(),
                api_url: "http://api".into(),
                user: Some("user-7".into()),
                ..Locals::default()
            },
            params,
        )
    }

    #[tokio::test]
    async fn ticker_is_sent_verbatim() {
        let flow = json!([{"strike": 190, "type": "call", "premium": 1_250_000}]);
        let stub = StubUpstream::json(flow.clone());
        let loader = UnusualActivity::new(stub::fetcher(&stub));
        let params: RouteParams = [(TICKER_PARAM, "brk.B")].into_iter().collect();
        let mut headers = ResponseHeaders::new();

        let data = loader
            .load(&page_request(params), &mut headers)
            .await
            .unwrap();

        assert_eq!(data.into_json(), json!({"getData": flow}));
        assert!(headers.is_empty());
        let call = stub.only_request();
        assert_eq!(call.url, "http://api/unusual-activity");
        assert_eq!(call.body, Some(json!({"ticker": "brk.B"})));
    }

    #[tokio::test]
    async fn missing_ticker_is_reported() {
        let stub = StubUpstream::json(json!([]));
        let loader = UnusualActivity::new(stub::fetcher(&stub));

        let err = loader
            .load(&page_request(RouteParams::new()), &mut ResponseHeaders::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::MissingParam { name: "tickerID" }));
        assert_eq!(stub.calls(), 0);
    }
}
