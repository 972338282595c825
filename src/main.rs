use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::sync::Mutex;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod client;
mod config;
mod events;
mod server;
mod storage;
mod stream;
mod transcript;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Terminal chat client for streamed assistant threads", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the thread bootstrap endpoint
    Serve,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Some(Commands::Serve) => {
            tracing_subscriber::fmt().with_env_filter(env_filter()).init();

            let listener = TcpListener::bind(&config.bind_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
            let state = server::AppState::new(config)?;
            server::serve(listener, state).await
        }
        None => {
            // The chat view owns the terminal, so diagnostics go to a
            // file instead of stderr
            let log_file =
                File::create(config.log_path()).context("Failed to create log file")?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .init();

            ui::run(config).await
        }
    }
}
