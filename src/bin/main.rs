//! ifwatch server: samples interface counters and serves them over HTTP

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use ifwatch::{Config, StatsService, SystemSource};

#[derive(Parser)]
#[command(name = "ifwatch")]
#[command(about = "Per-interface network traffic sampling with a live query endpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.config/ifwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. ":8080" or "127.0.0.1:9000"
    #[arg(short, long)]
    listen: Option<String>,

    /// Refresh interval in seconds
    #[arg(short, long)]
    interval: Option<f64>,

    /// Write the effective configuration to the default path and exit
    #[arg(long)]
    save_config: bool,
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen.clone();
    }
    if let Some(secs) = cli.interval {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(format!("Invalid interval: {}", secs).into());
        }
        config.stats.refresh_interval_ms = (secs * 1000.0).round().max(1.0) as u64;
    }
    config.stats.validate()?;

    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config(&cli)?;

    if cli.save_config {
        config.save()?;
        println!("Configuration written to {}", Config::default_path()?.display());
        return Ok(());
    }

    let addr = config.server.socket_addr()?;

    // Bind before sampling so a taken port fails fast
    let listener = match ifwatch::web::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    let stats = Arc::new(StatsService::new(SystemSource::new(), &config.stats)?);

    log::info!("Starting server on {}", addr);
    let result = ifwatch::web::serve(listener, Arc::clone(&stats), shutdown_signal()).await;

    stats.shutdown();

    if let Err(e) = result {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
