use std::sync::Arc;

use anyhow::{Context, Result};
use dashboard::{
    charts::ChartStore,
    command::{Command, HELP},
    config::Config,
    handler, view,
};
use stock::{AlphaVantageClient, Change, Watchlist};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let client = Arc::new(AlphaVantageClient::from_env().context("init market data client failed")?);

    let mut watchlist = Watchlist::new(client);
    let mut charts = ChartStore::new(config.chart_dir.clone());

    for symbol in &config.symbols {
        watchlist.add_symbol(symbol.clone());
    }
    info!(symbols = config.symbols.len(), "dashboard started");

    println!("{HELP}\n");
    print!("{}", view::render(&watchlist, &charts));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let redraw = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else { break };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => {
                        println!("{HELP}");
                        false
                    }
                    Ok(cmd) => {
                        if let Some(msg) = handler::handle(&mut watchlist, cmd) {
                            println!("{msg}");
                        }
                        true
                    }
                    Err(e) => {
                        println!("{e}");
                        false
                    }
                }
            }
            Some(change) = watchlist.next_update() => change != Change::Stale,
        };

        if redraw {
            if let Err(e) = charts.sync(&watchlist).await {
                warn!(error = ?e, "chart sync failed");
            }
            println!();
            print!("{}", view::render(&watchlist, &charts));
        }
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let (Ok(mut sigterm), Ok(mut sigint)) = (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) else {
            warn!("failed to install signal handlers");
            std::future::pending::<()>().await;
            return;
        };
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
