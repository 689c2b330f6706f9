use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::market_data::{Interval, MarketData, RawSeries, SearchMatch};
use crate::{FetchError, Symbol};

const DEFAULT_BASE_API: &str = "https://www.alphavantage.co";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Market data client backed by the Alpha Vantage query API.
#[derive(Clone)]
pub struct AlphaVantageClient {
    client: Client,
    base_api: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(base_api: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;

        Ok(Self {
            client,
            base_api: base_api.into(),
            api_key: api_key.into(),
        })
    }

    /// Reads ALPHAVANTAGE_API_KEY and the optional ALPHAVANTAGE_BASE_URL.
    ///
    /// A missing key is not fatal: upstream rejects every request, which shows
    /// up as a per-symbol no-data error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("ALPHAVANTAGE_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            warn!("ALPHAVANTAGE_API_KEY not set, market data requests will be rejected");
        }
        let base_api =
            lookup("ALPHAVANTAGE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_API.to_string());
        Self::new(base_api, api_key)
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.base_api.trim_end_matches('/'))
    }

    async fn get_text(&self, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let body = self
            .client
            .get(self.query_url())
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl MarketData for AlphaVantageClient {
    #[instrument(name = "symbol_search", skip(self))]
    async fn search_symbols(&self, keywords: &str) -> Result<Vec<SearchMatch>, FetchError> {
        let body = self
            .get_text(&[("function", "SYMBOL_SEARCH"), ("keywords", keywords)])
            .await?;
        let matches = parse_search(&body)?;
        debug!(matches = matches.len(), "search completed");
        Ok(matches)
    }

    #[instrument(name = "intraday_series", skip(self, symbol), fields(symbol = %symbol))]
    async fn intraday_series(
        &self,
        symbol: &Symbol,
        interval: Interval,
    ) -> Result<RawSeries, FetchError> {
        let body = self
            .get_text(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", symbol.as_str()),
                ("interval", interval.as_str()),
            ])
            .await?;
        let series = parse_series(symbol, &body)?;
        debug!(samples = series.closes.len(), "series received");
        Ok(series)
    }
}

//
// Match Alpha Vantage JSON
// https://www.alphavantage.co/documentation/#symbolsearch
//
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SearchResponseMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchResponseMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,

    #[serde(rename = "2. name")]
    name: String,
}

// https://www.alphavantage.co/documentation/#intraday
#[derive(Debug, Deserialize)]
struct IntradayResponse {
    #[serde(rename = "Meta Data")]
    meta: Option<IntradayMeta>,

    #[serde(rename = "Note")]
    note: Option<String>,

    #[serde(rename = "Information")]
    information: Option<String>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,

    // The series key embeds the interval, e.g. "Time Series (5min)".
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct IntradayMeta {
    #[serde(rename = "6. Time Zone")]
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntradayBar {
    #[serde(rename = "4. close")]
    close: String,
}

pub fn parse_search(body: &str) -> Result<Vec<SearchMatch>, FetchError> {
    let res: SearchResponse = serde_json::from_str(body)?;
    Ok(res
        .best_matches
        .into_iter()
        .map(|m| SearchMatch {
            symbol: m.symbol,
            name: m.name,
        })
        .collect())
}

pub fn parse_series(symbol: &Symbol, body: &str) -> Result<RawSeries, FetchError> {
    let res: IntradayResponse = serde_json::from_str(body)?;

    let Some(series) = res
        .rest
        .into_iter()
        .find_map(|(key, value)| key.starts_with("Time Series").then_some(value))
    else {
        return Err(FetchError::NoData {
            symbol: symbol.to_string(),
            detail: res.error_message.or(res.note).or(res.information),
        });
    };

    let bars: BTreeMap<String, IntradayBar> = serde_json::from_value(series)?;

    Ok(RawSeries {
        time_zone: res.meta.and_then(|m| m.time_zone),
        closes: bars.into_iter().map(|(ts, bar)| (ts, bar.close)).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").unwrap()
    }

    #[test]
    fn parses_best_matches_in_received_order() {
        let body = r#"{
            "bestMatches": [
                {"1. symbol": "AAPL", "2. name": "Apple Inc", "3. type": "Equity"},
                {"1. symbol": "APLE", "2. name": "Apple Hospitality REIT Inc", "3. type": "Equity"}
            ]
        }"#;

        let matches = parse_search(body).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].symbol, "AAPL");
        assert_eq!(matches[1].name, "Apple Hospitality REIT Inc");
    }

    #[test]
    fn missing_best_matches_is_empty() {
        let body = r#"{"Information": "The **demo** API key is for demo purposes only."}"#;
        assert!(parse_search(body).unwrap().is_empty());
    }

    #[test]
    fn parses_intraday_closes_and_time_zone() {
        let body = r#"{
            "Meta Data": {
                "1. Information": "Intraday (5min) open, high, low, close prices and volume",
                "2. Symbol": "AAPL",
                "4. Interval": "5min",
                "6. Time Zone": "US/Eastern"
            },
            "Time Series (5min)": {
                "2024-01-05 16:00:00": {"1. open": "181.10", "4. close": "181.18", "5. volume": "100"},
                "2024-01-05 15:55:00": {"1. open": "181.00", "4. close": "181.05", "5. volume": "200"}
            }
        }"#;

        let series = parse_series(&aapl(), body).unwrap();
        assert_eq!(series.time_zone.as_deref(), Some("US/Eastern"));
        assert_eq!(series.closes.len(), 2);
        assert_eq!(series.closes["2024-01-05 16:00:00"], "181.18");
    }

    #[test]
    fn quota_note_becomes_no_data() {
        let body = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#;

        let err = parse_series(&aapl(), body).unwrap_err();
        match err {
            FetchError::NoData { symbol, detail } => {
                assert_eq!(symbol, "AAPL");
                assert!(detail.unwrap().contains("call frequency"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_symbol_reports_error_message() {
        let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;

        let err = parse_series(&aapl(), body).unwrap_err();
        assert!(err.to_string().starts_with("no data available for AAPL (Invalid API call"));
    }

    #[test]
    fn garbage_body_is_malformed() {
        let err = parse_series(&aapl(), "<html>").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn missing_api_key_still_builds_client() {
        let client = AlphaVantageClient::from_lookup(|_| None).unwrap();
        assert!(client.api_key.is_empty());
        assert_eq!(client.query_url(), "https://www.alphavantage.co/query");
    }

    #[test]
    fn missing_api_key_reply_is_no_data() {
        let body = r#"{"Error Message": "the parameter apikey is invalid or missing."}"#;

        let err = parse_series(&aapl(), body).unwrap_err();
        assert!(matches!(err, FetchError::NoData { .. }));
        assert!(err.to_string().contains("apikey is invalid or missing"));
    }

    #[test]
    fn query_url_tolerates_trailing_slash() {
        let client = AlphaVantageClient::new("https://example.test/", "key").unwrap();
        assert_eq!(client.query_url(), "https://example.test/query");
    }
}
