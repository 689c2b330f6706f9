use stock::Watchlist;
use tracing::info;

use crate::command::{Command, Pick};

/// Applies one user command. Returns a message for the user, if any.
pub fn handle(watchlist: &mut Watchlist, cmd: Command) -> Option<String> {
    match cmd {
        Command::Search(text) => watchlist.query_changed(&text),
        Command::Pick(pick) => {
            let raw = match pick {
                Pick::Index(n) => {
                    match n.checked_sub(1).and_then(|i| watchlist.suggestions().get(i)) {
                        Some(m) => m.symbol.clone(),
                        None => return Some(format!("no suggestion #{n}")),
                    }
                }
                Pick::Symbol(s) => s,
            };
            match watchlist.select_suggestion(&raw) {
                Ok(true) => {}
                Ok(false) => {
                    return Some(format!("Already watching: {}", raw.trim().to_uppercase()));
                }
                Err(e) => return Some(e.to_string()),
            }
        }
        Command::Add(symbol) => {
            if !watchlist.add_symbol(symbol.clone()) {
                return Some(format!("Already watching: {symbol}"));
            }
        }
        Command::Sort => {
            watchlist.toggle_sort();
        }
        Command::Chart(symbol) => {
            watchlist.toggle_chart(&symbol);
        }
        Command::Retry(symbol) => {
            if !watchlist.retry(&symbol) {
                return Some(format!(
                    "{symbol} is not on the watchlist or is already loading"
                ));
            }
        }
        Command::Refresh => {
            let started = watchlist.refresh_all();
            info!(started, "refresh requested");
        }
        Command::Show | Command::Help | Command::Quit => {}
    }
    None
}
