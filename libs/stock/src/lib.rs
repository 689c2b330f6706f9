mod alpha_vantage;
mod error;
mod snapshot;
mod symbol;

pub mod chart;
pub mod market_data;
pub mod watchlist;

pub use alpha_vantage::{AlphaVantageClient, parse_search, parse_series};
pub use error::FetchError;
pub use market_data::{Interval, MarketData, RawSeries, SearchMatch};
pub use snapshot::{Sample, StockSnapshot};
pub use symbol::{Symbol, SymbolError};
pub use watchlist::{Change, ChartPanel, SortDirection, Status, Watchlist};
