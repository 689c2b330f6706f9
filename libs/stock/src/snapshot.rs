use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::{America::New_York, Tz};
use tracing::warn;

use crate::market_data::RawSeries;
use crate::{FetchError, Symbol};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const LABEL_FORMAT: &str = "%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Latest derived market state for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSnapshot {
    pub symbol: Symbol,
    pub latest_close: f64,
    pub change_pct: f64,
    /// Ascending by timestamp.
    pub history: Vec<Sample>,
    pub time_zone: Tz,
}

impl StockSnapshot {
    pub fn from_series(symbol: Symbol, series: RawSeries) -> Result<Self, FetchError> {
        let time_zone = resolve_zone(series.time_zone.as_deref());

        let mut history = series
            .closes
            .iter()
            .map(|(ts, close)| parse_sample(time_zone, ts, close))
            .collect::<Result<Vec<_>, _>>()?;
        history.sort_by_key(|s| s.timestamp);
        history.dedup_by_key(|s| s.timestamp);

        let [.., prev, last] = history.as_slice() else {
            return Err(FetchError::InsufficientHistory {
                samples: history.len(),
            });
        };

        if prev.close == 0.0 {
            return Err(FetchError::InvalidPrice {
                timestamp: prev.timestamp.to_rfc3339(),
                value: prev.close.to_string(),
            });
        }

        let latest_close = last.close;
        let change_pct = (last.close - prev.close) / prev.close * 100.0;

        Ok(Self {
            symbol,
            latest_close,
            change_pct,
            history,
            time_zone,
        })
    }

    /// Sample times in the exchange's zone, parallel to [`Self::closes`].
    pub fn labels(&self) -> Vec<String> {
        self.history
            .iter()
            .map(|s| {
                s.timestamp
                    .with_timezone(&self.time_zone)
                    .format(LABEL_FORMAT)
                    .to_string()
            })
            .collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.close).collect()
    }
}

fn resolve_zone(name: Option<&str>) -> Tz {
    match name {
        Some(name) => name.parse().unwrap_or_else(|_| {
            warn!(zone = name, "unknown time zone, assuming New York");
            New_York
        }),
        None => New_York,
    }
}

fn parse_sample(zone: Tz, ts: &str, close: &str) -> Result<Sample, FetchError> {
    let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(ts, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .map_err(|_| FetchError::InvalidTimestamp(ts.to_string()))?;

    let timestamp = zone
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| FetchError::InvalidTimestamp(ts.to_string()))?
        .with_timezone(&Utc);

    let close = close
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|c| c.is_finite())
        .ok_or_else(|| FetchError::InvalidPrice {
            timestamp: ts.to_string(),
            value: close.to_string(),
        })?;

    Ok(Sample { timestamp, close })
}
