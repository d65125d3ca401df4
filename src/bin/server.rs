//! krus-trader server - headless dual-market trading system.
//!
//! Runs the scoring/gating/sizing strategy engine against KR and US
//! equities on a schedule, with no UI and no HTTP server. Progress and
//! trade activity are reported via structured `tracing` logs and the
//! configured webhook notifier.
//!
//! # Usage
//! ```sh
//! RUN_MODE=paper cargo run --bin krus-trader
//! ```

use anyhow::Result;
use krus_trader::application::system::Application;
use krus_trader::config::Config;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("krus-trader {} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(mode = ?config.run_mode, universe = config.universe_symbols.len(), "configuration loaded");

    let app = Application::build(config).await?;
    app.start().await?;
    info!("trading system running, press Ctrl+C to shut down");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, exiting");

    Ok(())
}
