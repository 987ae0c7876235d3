use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use tokio::io::BufReader;

use coin_dashboard::api::{CoinGeckoClient, SharedProvider};
use coin_dashboard::cli::{Cli, Command};
use coin_dashboard::config::Config;
use coin_dashboard::dashboard::{terminal, DashboardView};
use coin_dashboard::orchestrator::FetchOrchestrator;
use coin_dashboard::web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    coin_dashboard::logging::init(cli.debug, cli.log_file.as_deref())?;

    let mut config = match Config::resolve(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            return Err(anyhow::anyhow!("Configuration loading failed: {}", e));
        }
    };
    info!("Configuration loaded.");

    let provider: SharedProvider = Arc::new(CoinGeckoClient::new(&config.upstream)?);

    match cli.command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let server = WebServer::new(provider);
            server
                .start(&host, port, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                    }
                })
                .await?;
        }
        Command::Watch { coins, days } => {
            if let Some(coins) = coins {
                config.dashboard.coins = coins;
            }
            if let Some(days) = days {
                config.dashboard.range_days = days;
            }

            let orchestrator = FetchOrchestrator::new(provider, config.dashboard.merge);
            let view = DashboardView::new(orchestrator, &config.dashboard);
            terminal::run(view, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
        }
    }

    Ok(())
}
