use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lifepath::api::{ServerConfig, run_http_server};
use lifepath::core::{RawProjectionRequest, normalize, simulate};

#[derive(Debug, Parser)]
#[command(
    name = "lifepath",
    about = "Year-by-year financial projections for student life paths"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the projection HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Seconds a cached projection stays valid; 0 disables the cache.
        #[arg(long, default_value_t = 30)]
        cache_ttl_secs: u64,
        #[arg(long, default_value_t = 256)]
        cache_capacity: usize,
    },
    /// Run one projection from a JSON request file and print the result.
    Project {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve {
            port,
            cache_ttl_secs,
            cache_capacity,
        } => {
            let config = ServerConfig {
                port,
                cache_ttl: Duration::from_secs(cache_ttl_secs),
                cache_capacity,
            };
            run_http_server(config)
                .await
                .context("HTTP server failed")?;
        }
        Command::Project { input, pretty } => project(&input, pretty)?,
    }
    Ok(())
}

fn project(path: &Path, pretty: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading request file {}", path.display()))?;
    let raw: RawProjectionRequest =
        serde_json::from_str(&text).context("parsing projection request JSON")?;
    let request = normalize(raw)?;
    info!(
        start_age = request.start_age,
        years = request.years_to_project,
        milestones = request.milestones.len(),
        "running projection"
    );
    let result = simulate(&request)?;

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(())
}
