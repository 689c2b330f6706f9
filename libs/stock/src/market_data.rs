use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{FetchError, Symbol};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub symbol: String,
    pub name: String,
}

/// Bar spacing of an intraday series. The dashboard only charts 5-minute bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Minute5,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Minute5 => "5min",
        }
    }
}

/// Intraday payload as delivered upstream: timestamp string -> close string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    /// IANA zone the timestamps are expressed in, when the upstream reports one.
    pub time_zone: Option<String>,
    pub closes: BTreeMap<String, String>,
}

impl RawSeries {
    pub fn with_close(mut self, timestamp: impl Into<String>, close: impl Into<String>) -> Self {
        self.closes.insert(timestamp.into(), close.into());
        self
    }
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Best-effort ticker / company-name lookup.
    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SearchMatch>, FetchError>;

    async fn intraday_series(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> Result<RawSeries, FetchError>;
}
