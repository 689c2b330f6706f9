use std::fmt::Write;

use stock::{SortDirection, Status, Watchlist};

use crate::charts::ChartStore;

const PLACEHOLDER: &str = "—";

/// Text rendering of the search box, the price table and expanded charts.
pub fn render(watchlist: &Watchlist, charts: &ChartStore) -> String {
    let mut out = String::new();

    render_search(&mut out, watchlist);
    render_table(&mut out, watchlist);
    render_charts(&mut out, watchlist, charts);

    out
}

fn render_search(out: &mut String, watchlist: &Watchlist) {
    if watchlist.query().is_empty() {
        return;
    }

    let _ = writeln!(out, "search: {}", watchlist.query());
    for (i, m) in watchlist.suggestions().iter().enumerate() {
        let _ = writeln!(out, "  {}. {:<10} {}", i + 1, m.symbol, m.name);
    }
    out.push('\n');
}

fn render_table(out: &mut String, watchlist: &Watchlist) {
    let arrow = match watchlist.sort_direction() {
        SortDirection::Ascending => "▲",
        SortDirection::Descending => "▼",
    };

    let _ = writeln!(out, "{:<10} {:>12} {:>10}", "Symbol", format!("Price {arrow}"), "Change %");

    for snap in watchlist.sorted_rows() {
        let _ = writeln!(
            out,
            "{:<10} {:>12.2} {:>9.2}%",
            snap.symbol, snap.latest_close, snap.change_pct
        );
    }

    for (symbol, status) in watchlist.entries() {
        let note = match status {
            Status::Ready(_) | Status::Loading { previous: Some(_) } => continue,
            Status::Loading { previous: None } => "loading…",
            Status::Errored(msg) => msg.as_str(),
        };
        let _ = writeln!(
            out,
            "{:<10} {:>12} {:>10}  {}",
            symbol, PLACEHOLDER, PLACEHOLDER, note
        );
    }
}

fn render_charts(out: &mut String, watchlist: &Watchlist, charts: &ChartStore) {
    let panels = watchlist.expanded_charts();
    if panels.is_empty() {
        return;
    }

    out.push('\n');
    for panel in panels {
        let body = match (panel.snapshot, panel.error) {
            (Some(snap), _) => match charts.current(panel.symbol, snap) {
                Some(path) => format!("chart: {}", path.display()),
                None => "chart: rendering…".to_string(),
            },
            (None, Some(err)) => err.to_string(),
            (None, None) => "no data available".to_string(),
        };
        let _ = writeln!(out, "▸ {}: {}", panel.symbol, body);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use stock::{FetchError, Interval, MarketData, RawSeries, SearchMatch, Symbol};

    use super::*;

    struct StaticMarket;

    #[async_trait]
    impl MarketData for StaticMarket {
        async fn search_symbols(&self, _: &str) -> Result<Vec<SearchMatch>, FetchError> {
            Ok(vec![SearchMatch {
                symbol: "AAPL".into(),
                name: "Apple Inc".into(),
            }])
        }

        async fn intraday_series(
            &self,
            symbol: &Symbol,
            _: Interval,
        ) -> Result<RawSeries, FetchError> {
            let close = match symbol.as_str() {
                "AAPL" => "181.18",
                "MSFT" => "370.00",
                _ => {
                    return Err(FetchError::NoData {
                        symbol: symbol.to_string(),
                        detail: None,
                    });
                }
            };
            Ok(RawSeries::default()
                .with_close("2024-01-05 15:55:00", "100.00")
                .with_close("2024-01-05 16:00:00", close))
        }
    }

    fn sym(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    async fn loaded() -> Watchlist {
        let mut wl = Watchlist::new(Arc::new(StaticMarket));
        for s in ["MSFT", "BAD", "AAPL"] {
            wl.add_symbol(sym(s));
        }
        for _ in 0..3 {
            wl.next_update().await;
        }
        wl
    }

    #[tokio::test]
    async fn table_lists_resolved_rows_sorted_then_placeholders() {
        let mut wl = loaded().await;
        wl.add_symbol(sym("NVDA"));

        let text = render(&wl, &ChartStore::new("charts"));
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Symbol"));
        assert!(lines[0].contains("Price ▲"));
        assert!(lines[1].starts_with("AAPL") && lines[1].contains("181.18"));
        assert!(lines[1].contains("81.18%"));
        assert!(lines[2].starts_with("MSFT") && lines[2].contains("270.00%"));
        assert!(lines[3].starts_with("BAD") && lines[3].contains("no data available for BAD"));
        assert!(lines[3].contains(PLACEHOLDER));
        assert!(lines[4].starts_with("NVDA") && lines[4].ends_with("loading…"));

        wl.next_update().await;
        wl.toggle_sort();
        let text = render(&wl, &ChartStore::new("charts"));
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("Price ▼"));
        assert!(lines[1].starts_with("MSFT"));
    }

    #[tokio::test]
    async fn suggestions_are_numbered_under_the_query() {
        let mut wl = Watchlist::new(Arc::new(StaticMarket));
        wl.query_changed("app");
        wl.next_update().await;

        let text = render(&wl, &ChartStore::new("charts"));
        assert!(text.starts_with("search: app\n  1. AAPL"));
        assert!(text.contains("Apple Inc"));
    }

    #[tokio::test]
    async fn chart_panels_show_state() {
        let mut wl = loaded().await;
        wl.toggle_chart(&sym("AAPL"));
        wl.toggle_chart(&sym("BAD"));
        wl.toggle_chart(&sym("ZZZ"));

        let text = render(&wl, &ChartStore::new("charts"));

        assert!(text.contains("▸ AAPL: chart: rendering…"));
        assert!(text.contains("▸ BAD: no data available for BAD"));
        assert!(text.contains("▸ ZZZ: no data available"));
    }
}
