use std::str::FromStr;

use anyhow::{Error, bail};
use stock::Symbol;

pub const HELP: &str = "\
commands:
  search <text>     look up symbols by ticker or company name (alias: s)
  pick <n|SYMBOL>   add a suggestion to the watchlist
  add <SYMBOL>      add a symbol directly
  sort              toggle price sort direction
  chart <SYMBOL>    show or hide a symbol's chart
  retry <SYMBOL>    fetch a symbol again
  refresh           fetch every symbol again
  show              redraw the table
  help              this message
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    /// 1-based position in the suggestion list.
    Index(usize),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Pick(Pick),
    Add(Symbol),
    Sort,
    Chart(Symbol),
    Retry(Symbol),
    Refresh,
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_start();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        let cmd = match verb.to_lowercase().as_str() {
            // The search text is kept verbatim; the watchlist trims it.
            "search" | "s" => Command::Search(rest.to_string()),
            "pick" | "p" => {
                let arg = rest.trim();
                if arg.is_empty() {
                    bail!("usage: pick <n|SYMBOL>");
                }
                match arg.parse::<usize>() {
                    Ok(n) => Command::Pick(Pick::Index(n)),
                    Err(_) => Command::Pick(Pick::Symbol(arg.to_string())),
                }
            }
            "add" => Command::Add(symbol_arg("add", rest)?),
            "sort" => Command::Sort,
            "chart" | "c" => Command::Chart(symbol_arg("chart", rest)?),
            "retry" => Command::Retry(symbol_arg("retry", rest)?),
            "refresh" => Command::Refresh,
            "show" | "" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command `{other}`, try `help`"),
        };

        Ok(cmd)
    }
}

fn symbol_arg(verb: &str, rest: &str) -> Result<Symbol, Error> {
    if rest.trim().is_empty() {
        bail!("usage: {verb} <SYMBOL>");
    }
    Ok(Symbol::parse(rest)?)
}
