use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use levy::liveness::MIN_INTERVAL;
use levy::{watch, HttpSessionRefresher, LevyClient, LivenessStart};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "levy", about = "Levy: client for the levy server", version)]
struct Cli {
    /// Server URL
    #[arg(long, env = "LEVY_URL", default_value = "http://localhost:8080", global = true)]
    url: String,
    /// Session token
    #[arg(long, env = "LEVY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current session
    Whoami,
    /// Keep the session alive until interrupted
    Watch {
        /// Refresh interval, e.g. 30s, 5m
        #[arg(long, default_value = "30s")]
        interval: humantime::Duration,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LEVY_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let token = cli
        .token
        .context("no session token; set LEVY_TOKEN or pass --token")?;
    let client = LevyClient::new(&cli.url, token)?;

    match cli.command {
        Commands::Whoami => cmd_whoami(&client).await,
        Commands::Watch { interval } => cmd_watch(client, interval.into()).await,
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_whoami(client: &LevyClient) -> Result<()> {
    let session = client.session().await?;
    println!("user:     {}", session.user_id);
    println!("role:     {}", session.role);
    println!("expires:  {}", session.expires_at_display);
    if !session.capabilities.is_empty() {
        println!("can:      {}", session.capabilities.join(", "));
    }
    Ok(())
}

async fn cmd_watch(client: LevyClient, interval: std::time::Duration) -> Result<()> {
    let interval = interval.max(MIN_INTERVAL);
    let status = client.status().await?;
    let refresher = Arc::new(HttpSessionRefresher::new(client.clone()));

    let guard = match watch(status, refresher, interval) {
        LivenessStart::Redirect { notice, location } => {
            anyhow::bail!("{notice}; sign in again at {location}");
        }
        LivenessStart::Watching(guard) => guard,
    };

    eprintln!(
        "keeping session alive every {}; press Ctrl-C to stop",
        humantime::format_duration(interval)
    );
    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    drop(guard);

    // Print the latest token so the caller can keep using it.
    println!("{}", client.token());
    Ok(())
}
