//! Page loaders: one upstream fetch per page view, shaped for the view layer.
//!
//! Every loader implements [`PageLoader`]: it reads the [`PageRequest`],
//! issues at most one upstream call, may set response headers, and returns
//! a single-key [`PageData`].
//!
//! | Route | Loader | Field |
//! |---|---|---|
//! | `/economic-indicator` | [`MarketSnapshot::economic_indicator`] | `getEconomicIndicator` |
//! | `/industry/sectors` | [`MarketSnapshot::sector_overview`] | `getSectorOverview` |
//! | `/leaderboard` | [`Leaderboard`] | `getLeaderboard` |
//! | `/list/hottest-contracts` | [`ListCategory::hottest_contracts`] | `getStocks` |
//! | `/list/overbought-stocks` | [`ListCategory::overbought_stocks`] | `getOverBoughtStocks` |
//! | `/stocks/:tickerID/options/unusual-activity` | [`UnusualActivity`] | `getData` |

use async_trait::async_trait;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::context::{PageRequest, ResponseHeaders};
use crate::error::LoadError;

mod leaderboard;
mod lists;
mod market;
mod options;

pub use leaderboard::{Clock, FixedClock, Leaderboard, MonthWindow, SystemClock, rank_items};
pub use lists::ListCategory;
pub use market::MarketSnapshot;
pub use options::UnusualActivity;

pub const CACHE_CONTROL: &str = "cache-control";

/// Result of one load: `{ field: value }`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageData {
    pub field: &'static str,
    pub value: Value,
}

impl PageData {
    pub fn new(field: &'static str, value: Value) -> Self {
        Self { field, value }
    }

    /// The single-key JSON object handed to the view layer.
    pub fn into_json(self) -> Value {
        let mut map = serde_json::Map::with_capacity(1);
        map.insert(self.field.to_owned(), self.value);
        Value::Object(map)
    }
}

impl Serialize for PageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field, &self.value)?;
        map.end()
    }
}

/// How the five-minute `cache-control` value of the overbought list is
/// written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheHeaderStyle {
    /// `public, max-age=60*5`, byte-for-byte as the page always sent it.
    #[default]
    Verbatim,
    /// `public, max-age=300`.
    Computed,
}

impl CacheHeaderStyle {
    pub fn five_minutes(self) -> &'static str {
        match self {
            Self::Verbatim => "public, max-age=60*5",
            Self::Computed => "public, max-age=300",
        }
    }
}

impl std::str::FromStr for CacheHeaderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbatim" => Ok(Self::Verbatim),
            "computed" => Ok(Self::Computed),
            other => Err(format!("unknown cache header style `{other}`")),
        }
    }
}

/// Fetches and shapes the data for one page.
#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Page route this loader serves, in router pattern syntax.
    fn route(&self) -> &'static str;

    /// Key of the returned [`PageData`].
    fn field(&self) -> &'static str;

    async fn load(
        &self,
        request: &PageRequest,
        headers: &mut ResponseHeaders,
    ) -> Result<PageData, LoadError>;
}
