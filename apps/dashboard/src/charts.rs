use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stock::{StockSnapshot, Symbol, Watchlist, chart};
use tracing::{debug, info, instrument, warn};

struct Rendered {
    snapshot: StockSnapshot,
    path: PathBuf,
}

/// PNG charts for expanded symbols, written to one directory.
pub struct ChartStore {
    dir: PathBuf,
    rendered: HashMap<Symbol, Rendered>,
}

impl ChartStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rendered: HashMap::new(),
        }
    }

    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.dir.join(format!("{}_chart.png", symbol))
    }

    /// Path of the chart drawn from the symbol's current snapshot, if any.
    pub fn current(&self, symbol: &Symbol, snapshot: &StockSnapshot) -> Option<&Path> {
        self.rendered
            .get(symbol)
            .filter(|r| &r.snapshot == snapshot)
            .map(|r| r.path.as_path())
    }

    /// Draws every expanded chart whose snapshot changed since it was last drawn.
    #[instrument(name = "sync_charts", skip_all)]
    pub async fn sync(&mut self, watchlist: &Watchlist) -> Result<()> {
        let stale: Vec<StockSnapshot> = watchlist
            .expanded_charts()
            .into_iter()
            .filter_map(|panel| panel.snapshot)
            .filter(|snap| self.current(&snap.symbol, snap).is_none())
            .cloned()
            .collect();

        if stale.is_empty() {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create chart dir {}", self.dir.display()))?;

        for snapshot in stale {
            let symbol = snapshot.symbol.clone();
            let path = self.path_for(&symbol);

            debug!(symbol = %symbol, "generating chart (spawn_blocking)");
            let to_render = snapshot.clone();
            let bytes = match tokio::task::spawn_blocking(move || {
                chart::render_history(&to_render, chart::WIDTH, chart::HEIGHT)
            })
            .await
            {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    warn!(symbol = %symbol, error = ?e, "render_history failed");
                    continue;
                }
                Err(e) => {
                    warn!(symbol = %symbol, error = ?e, "spawn_blocking join failed");
                    continue;
                }
            };

            if let Err(e) = tokio::fs::write(&path, &bytes).await {
                warn!(symbol = %symbol, path = %path.display(), error = ?e, "write chart failed");
                continue;
            }

            info!(symbol = %symbol, bytes = bytes.len(), path = %path.display(), "chart generated");
            self.rendered.insert(symbol, Rendered { snapshot, path });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_files_are_named_by_symbol() {
        let store = ChartStore::new("out");
        let path = store.path_for(&Symbol::parse("aapl").unwrap());
        assert_eq!(path, PathBuf::from("out").join("AAPL_chart.png"));
    }
}
