use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

use crate::market_data::{Interval, MarketData, SearchMatch};
use crate::{FetchError, StockSnapshot, Symbol, SymbolError};

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Loading { previous: Option<StockSnapshot> },
    Ready(StockSnapshot),
    Errored(String),
}

impl Status {
    pub fn snapshot(&self) -> Option<&StockSnapshot> {
        match self {
            Status::Ready(snap) => Some(snap),
            Status::Loading { previous } => previous.as_ref(),
            Status::Errored(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Status::Errored(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// What a merged completion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Resolved(Symbol),
    Failed(Symbol),
    Suggestions,
    /// Completion of a superseded request; nothing changed.
    Stale,
}

#[derive(Debug, Clone, Copy)]
pub struct ChartPanel<'a> {
    pub symbol: &'a Symbol,
    pub snapshot: Option<&'a StockSnapshot>,
    pub error: Option<&'a str>,
}

#[derive(Debug)]
enum Completion {
    Fetched {
        symbol: Symbol,
        generation: u64,
        result: Result<StockSnapshot, FetchError>,
    },
    Searched {
        generation: u64,
        matches: Vec<SearchMatch>,
    },
}

#[derive(Debug)]
struct Entry {
    symbol: Symbol,
    status: Status,
    generation: u64,
}

/// Tracked symbols and their per-symbol fetch state.
///
/// Operations spawn requests on the current Tokio runtime; their completions are
/// merged back only through [`Watchlist::next_update`], so all state changes
/// happen on the task that owns the watchlist.
pub struct Watchlist {
    client: Arc<dyn MarketData>,
    entries: Vec<Entry>,
    selected: BTreeSet<Symbol>,
    sort: SortDirection,
    query: String,
    suggestions: Vec<SearchMatch>,
    search_generation: u64,
    fetch_generation: u64,
    tx: UnboundedSender<Completion>,
    rx: UnboundedReceiver<Completion>,
}

impl Watchlist {
    pub fn new(client: Arc<dyn MarketData>) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            client,
            entries: Vec::new(),
            selected: BTreeSet::new(),
            sort: SortDirection::default(),
            query: String::new(),
            suggestions: Vec::new(),
            search_generation: 0,
            fetch_generation: 0,
            tx,
            rx,
        }
    }

    /// Appends `symbol` and starts its first fetch.
    /// Returns false if it was already tracked.
    pub fn add_symbol(&mut self, symbol: Symbol) -> bool {
        if self.contains(&symbol) {
            debug!(symbol = %symbol, "already watching");
            return false;
        }

        info!(symbol = %symbol, "watching");
        self.entries.push(Entry {
            symbol,
            status: Status::Loading { previous: None },
            generation: 0,
        });
        let idx = self.entries.len() - 1;
        self.spawn_fetch(idx);
        true
    }

    /// Stores the search box text and, for queries of at least
    /// [`MIN_QUERY_CHARS`], requests suggestions.
    pub fn query_changed(&mut self, text: &str) {
        self.query = text.to_string();
        self.search_generation += 1;

        let keywords = text.trim();
        if keywords.chars().count() < MIN_QUERY_CHARS {
            self.suggestions.clear();
            return;
        }

        let generation = self.search_generation;
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let keywords = keywords.to_string();
        let span = info_span!("search", query = %keywords, generation);

        tokio::spawn(
            async move {
                let mut matches = match client.search_symbols(&keywords).await {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(error = %e, "symbol search failed");
                        Vec::new()
                    }
                };
                matches.truncate(MAX_SUGGESTIONS);
                let _ = tx.send(Completion::Searched {
                    generation,
                    matches,
                });
            }
            .instrument(span),
        );
    }

    /// Adds the chosen suggestion and resets the search box.
    pub fn select_suggestion(&mut self, raw: &str) -> Result<bool, SymbolError> {
        self.query.clear();
        self.suggestions.clear();
        self.search_generation += 1;

        let symbol = Symbol::parse(raw)?;
        Ok(self.add_symbol(symbol))
    }

    /// Returns true if the chart is now expanded.
    pub fn toggle_chart(&mut self, symbol: &Symbol) -> bool {
        if self.selected.remove(symbol) {
            false
        } else {
            self.selected.insert(symbol.clone());
            true
        }
    }

    pub fn toggle_sort(&mut self) -> SortDirection {
        self.sort = self.sort.toggled();
        self.sort
    }

    /// Refetches one symbol. Errored symbols stay errored until this is called.
    /// Returns false if the symbol is unknown or already in flight.
    pub fn retry(&mut self, symbol: &Symbol) -> bool {
        match self.position(symbol) {
            Some(idx) if !self.entries[idx].status.is_loading() => {
                self.spawn_fetch(idx);
                true
            }
            _ => false,
        }
    }

    /// Refetches every symbol that has no request in flight.
    pub fn refresh_all(&mut self) -> usize {
        let idle: Vec<usize> = (0..self.entries.len())
            .filter(|&i| !self.entries[i].status.is_loading())
            .collect();
        for &idx in &idle {
            self.spawn_fetch(idx);
        }
        idle.len()
    }

    /// Waits for the next request to finish and merges its result.
    pub async fn next_update(&mut self) -> Option<Change> {
        let completion = self.rx.recv().await?;
        Some(self.apply(completion))
    }

    fn apply(&mut self, completion: Completion) -> Change {
        match completion {
            Completion::Fetched {
                symbol,
                generation,
                result,
            } => {
                let Some(entry) = self
                    .entries
                    .iter_mut()
                    .find(|e| e.symbol == symbol && e.generation == generation)
                else {
                    debug!(symbol = %symbol, generation, "dropping superseded fetch");
                    return Change::Stale;
                };

                match result {
                    Ok(snapshot) => {
                        info!(
                            symbol = %symbol,
                            latest_close = snapshot.latest_close,
                            change_pct = snapshot.change_pct,
                            samples = snapshot.history.len(),
                            "snapshot updated"
                        );
                        entry.status = Status::Ready(snapshot);
                        Change::Resolved(symbol)
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "fetch failed");
                        entry.status = Status::Errored(e.to_string());
                        Change::Failed(symbol)
                    }
                }
            }
            Completion::Searched {
                generation,
                matches,
            } => {
                if generation != self.search_generation {
                    debug!(generation, "dropping superseded search");
                    return Change::Stale;
                }
                debug!(matches = matches.len(), "suggestions updated");
                self.suggestions = matches;
                Change::Suggestions
            }
        }
    }

    fn spawn_fetch(&mut self, idx: usize) {
        self.fetch_generation += 1;
        let generation = self.fetch_generation;

        let entry = &mut self.entries[idx];
        let loading = Status::Loading { previous: None };
        let previous = match std::mem::replace(&mut entry.status, loading) {
            Status::Ready(snap) => Some(snap),
            Status::Loading { previous } => previous,
            Status::Errored(_) => None,
        };
        entry.status = Status::Loading { previous };
        entry.generation = generation;

        let symbol = entry.symbol.clone();
        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let span = info_span!("fetch_snapshot", symbol = %symbol, generation);

        tokio::spawn(
            async move {
                let result = match client.intraday_series(&symbol, Interval::Minute5).await {
                    Ok(series) => StockSnapshot::from_series(symbol.clone(), series),
                    Err(e) => Err(e),
                };
                let _ = tx.send(Completion::Fetched {
                    symbol,
                    generation,
                    result,
                });
            }
            .instrument(span),
        );
    }

    fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.entries.iter().position(|e| &e.symbol == symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.position(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every tracked symbol in first-added order.
    pub fn entries(&self) -> impl Iterator<Item = (&Symbol, &Status)> {
        self.entries.iter().map(|e| (&e.symbol, &e.status))
    }

    pub fn status(&self, symbol: &Symbol) -> Option<&Status> {
        self.entries
            .iter()
            .find(|e| &e.symbol == symbol)
            .map(|e| &e.status)
    }

    pub fn snapshot(&self, symbol: &Symbol) -> Option<&StockSnapshot> {
        self.status(symbol).and_then(Status::snapshot)
    }

    pub fn error(&self, symbol: &Symbol) -> Option<&str> {
        self.status(symbol).and_then(Status::error)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[SearchMatch] {
        &self.suggestions
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort
    }

    pub fn is_expanded(&self, symbol: &Symbol) -> bool {
        self.selected.contains(symbol)
    }

    /// Snapshots of tracked symbols, ordered by latest close.
    pub fn sorted_rows(&self) -> Vec<&StockSnapshot> {
        let mut rows: Vec<&StockSnapshot> = self
            .entries
            .iter()
            .filter_map(|e| e.status.snapshot())
            .collect();

        rows.sort_by(|a, b| {
            let ord = a.latest_close.total_cmp(&b.latest_close);
            match self.sort {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        rows
    }

    pub fn expanded_charts(&self) -> Vec<ChartPanel<'_>> {
        self.selected
            .iter()
            .map(|symbol| {
                let status = self.status(symbol);
                ChartPanel {
                    symbol,
                    snapshot: status.and_then(Status::snapshot),
                    error: status.and_then(Status::error),
                }
            })
            .collect()
    }
}
