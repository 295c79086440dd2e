use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{PageData, PageLoader};
use crate::cache::{CacheKey, PageCache, SingleFlight};
use crate::context::{PageRequest, ResponseHeaders};
use crate::error::LoadError;
use crate::upstream::{Fetcher, UpstreamRequest};

const FIELD: &str = "getLeaderboard";
const CACHE_SCOPE: &str = "";

/// Source of "today" for the leaderboard window.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Current UTC date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// First day of a month through first day of the next, serialized as
/// `{"startDate": "YYYY-MM-01", "endDate": "YYYY-MM-01"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl MonthWindow {
    /// Window of the month containing `day`; `None` past the calendar's end.
    pub fn containing(day: NaiveDate) -> Option<Self> {
        let start_date = day.with_day(1)?;
        let end_date = start_date.checked_add_months(Months::new(1))?;
        Some(Self {
            start_date,
            end_date,
        })
    }
}

fn numeric_rank(item: &Value) -> Option<f64> {
    item.get("rank").and_then(Value::as_f64)
}

/// Drops entries ranked `0` and orders the rest by ascending rank.
///
/// Entries without a numeric `rank` are kept, after every ranked entry,
/// in their original order.
pub fn rank_items(items: Vec<Value>) -> Vec<Value> {
    let mut kept: Vec<Value> = items
        .into_iter()
        .filter(|item| numeric_rank(item) != Some(0.0))
        .collect();
    kept.sort_by(|a, b| match (numeric_rank(a), numeric_rank(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    kept
}

// The service wraps entries as `{"items": [...]}`; a bare array is taken as
// the items themselves. Anything else has nothing to rank.
fn shape(body: Value) -> Value {
    let items = match body {
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Value::Null,
        },
        Value::Array(items) => items,
        _ => return Value::Null,
    };
    Value::Array(rank_items(items))
}

/// Monthly leaderboard from the internal service, memoized in a
/// [`PageCache`] under `("", "getLeaderboard")`.
pub struct Leaderboard {
    fetcher: Fetcher,
    cache: Arc<dyn PageCache>,
    flights: SingleFlight,
    clock: Arc<dyn Clock>,
}

impl Leaderboard {
    pub fn new(fetcher: Fetcher, cache: Arc<dyn PageCache>) -> Self {
        Self::with_clock(fetcher, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(fetcher: Fetcher, cache: Arc<dyn PageCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            cache,
            flights: SingleFlight::new(),
            clock,
        }
    }

    pub fn window(&self) -> Result<MonthWindow, LoadError> {
        MonthWindow::containing(self.clock.today()).ok_or(LoadError::DateOutOfRange)
    }

    async fn fetch(&self, request: &PageRequest) -> Result<Value, LoadError> {
        let window = self.window()?;
        let call = UpstreamRequest::post(request.locals.require_fastify_url()?, "/leaderboard")
            .json(&window)?;
        let body = self.fetcher.fetch_json(call).await?;
        Ok(shape(body))
    }
}

#[async_trait]
impl PageLoader for Leaderboard {
    fn route(&self) -> &'static str {
        "/leaderboard"
    }

    fn field(&self) -> &'static str {
        FIELD
    }

    async fn load(
        &self,
        request: &PageRequest,
        _headers: &mut ResponseHeaders,
    ) -> Result<PageData, LoadError> {
        if let Some(cached) = self.cache.get(CACHE_SCOPE, FIELD).await {
            debug!(name = FIELD, "leaderboard cache hit");
            return Ok(PageData::new(FIELD, cached));
        }

        let _flight = self.flights.acquire(&CacheKey::new(CACHE_SCOPE, FIELD)).await;
        // Whoever held the key before us may have filled it.
        if let Some(cached) = self.cache.get(CACHE_SCOPE, FIELD).await {
            debug!(name = FIELD, "leaderboard filled while waiting");
            return Ok(PageData::new(FIELD, cached));
        }

        debug!(name = FIELD, "leaderboard cache miss");
        let output = self.fetch(request).await?;
        if !output.is_null() {
            self.cache.set(CACHE_SCOPE, FIELD, output.clone()).await;
        }

        Ok(PageData::new(FIELD, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::context::{Locals, RouteParams};
    use crate::upstream::UpstreamMethod;
    use crate::upstream::stub::{self, StubUpstream};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn page_request() -> PageRequest {
        PageRequest::new(
            Locals {
                fastify_url: "http://fastify:2000".into(),
                ..Locals::default()
            },
            RouteParams::new(),
        )
    }

    fn loader(stub: &Arc<StubUpstream>, cache: Arc<MemoryCache>, today: NaiveDate) -> Leaderboard {
        Leaderboard::with_clock(stub::fetcher(stub), cache, Arc::new(FixedClock(today)))
    }

    #[test]
    fn window_mid_month() {
        let window = MonthWindow::containing(date(2024, 3, 15)).unwrap();
        assert_eq!(
            serde_json::to_value(window).unwrap(),
            json!({"startDate": "2024-03-01", "endDate": "2024-04-01"})
        );
    }

    #[test]
    fn window_rolls_over_the_year() {
        let window = MonthWindow::containing(date(2024, 12, 20)).unwrap();
        assert_eq!(window.start_date, date(2024, 12, 1));
        assert_eq!(window.end_date, date(2025, 1, 1));
    }

    #[test]
    fn window_on_first_and_last_day() {
        assert_eq!(
            MonthWindow::containing(date(2024, 2, 29)).unwrap().end_date,
            date(2024, 3, 1)
        );
        assert_eq!(
            MonthWindow::containing(date(2024, 1, 1)).unwrap().start_date,
            date(2024, 1, 1)
        );
    }

    #[test]
    fn rank_zero_dropped_rest_sorted() {
        let items = vec![
            json!({"rank": 0, "user": "a"}),
            json!({"rank": 3, "user": "b"}),
            json!({"rank": 1, "user": "c"}),
        ];
        assert_eq!(
            rank_items(items),
            vec![json!({"rank": 1, "user": "c"}), json!({"rank": 3, "user": "b"})]
        );
    }

    #[test]
    fn unranked_items_trail_in_original_order() {
        let items = vec![
            json!({"user": "x"}),
            json!({"rank": 2}),
            json!({"rank": "1", "user": "y"}),
            json!({"rank": 1}),
        ];
        assert_eq!(
            rank_items(items),
            vec![
                json!({"rank": 1}),
                json!({"rank": 2}),
                json!({"user": "x"}),
                json!({"rank": "1", "user": "y"}),
            ]
        );
    }

    #[test]
    fn shape_accepts_items_object_or_array() {
        assert_eq!(
            shape(json!({"items": [{"rank": 2}, {"rank": 1}], "total": 2})),
            json!([{"rank": 1}, {"rank": 2}])
        );
        assert_eq!(shape(json!([{"rank": 0}])), json!([]));
        assert_eq!(shape(json!({"error": "nope"})), Value::Null);
    }

    #[tokio::test]
    async fn first_load_calls_out_once_and_fills_cache() {
        let stub = StubUpstream::json(json!({
            "items": [{"rank": 0}, {"rank": 3}, {"rank": 1}]
        }));
        let cache = Arc::new(MemoryCache::default());
        let loader = loader(&stub, cache.clone(), date(2024, 3, 15));

        let data = loader
            .load(&page_request(), &mut ResponseHeaders::new())
            .await
            .unwrap();

        assert_eq!(data.into_json(), json!({"getLeaderboard": [{"rank": 1}, {"rank": 3}]}));
        let call = stub.only_request();
        assert_eq!(call.method, UpstreamMethod::Post);
        assert_eq!(call.url, "http://fastify:2000/leaderboard");
        assert!(!call.headers.contains("x-api-key"));
        assert_eq!(
            call.body,
            Some(json!({"startDate": "2024-03-01", "endDate": "2024-04-01"}))
        );
        assert_eq!(
            cache.get("", "getLeaderboard").await,
            Some(json!([{"rank": 1}, {"rank": 3}]))
        );
    }

    #[tokio::test]
    async fn cached_value_skips_upstream() {
        let stub = StubUpstream::json(json!({"items": []}));
        let cache = Arc::new(MemoryCache::default());
        let cached = json!([{"rank": 5, "note": "as stored"}]);
        cache.set("", "getLeaderboard", cached.clone()).await;
        let loader = loader(&stub, cache, date(2024, 12, 20));

        let data = loader
            .load(&page_request(), &mut ResponseHeaders::new())
            .await
            .unwrap();

        assert_eq!(data.value, cached);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn unexpected_shape_is_returned_but_not_cached() {
        let stub = StubUpstream::json(json!({"message": "maintenance"}));
        let cache = Arc::new(MemoryCache::default());
        let loader = loader(&stub, cache.clone(), date(2024, 3, 15));

        let data = loader
            .load(&page_request(), &mut ResponseHeaders::new())
            .await
            .unwrap();

        assert_eq!(data.value, Value::Null);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_call() {
        let stub = StubUpstream::json(json!({"items": [{"rank": 1}]}));
        let cache = Arc::new(MemoryCache::default());
        let loader = Arc::new(loader(&stub, cache, date(2024, 3, 15)));

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let loader = Arc::clone(&loader);
            tasks.push(tokio::spawn(async move {
                loader
                    .load(&page_request(), &mut ResponseHeaders::new())
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().value, json!([{"rank": 1}]));
        }

        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn missing_service_url_fails() {
        let stub = StubUpstream::json(json!({"items": []}));
        let loader = loader(&stub, Arc::new(MemoryCache::default()), date(2024, 3, 15));

        let err = loader
            .load(&PageRequest::default(), &mut ResponseHeaders::new())
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::Context("fastifyURL")));
        assert_eq!(stub.calls(), 0);
    }
}
