use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use levy_server::role::Role;
use levy_server::session::{Session, SessionKey};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "levyd",
    about = "Levyd: vehicle levy management server daemon",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the levy HTTP server
    Serve {
        /// Port to listen on (default: $LEVY_PORT or 8080)
        #[arg(long, env = "LEVY_PORT", default_value = "8080")]
        port: u16,
        /// Host to bind (default: $LEVY_HOST or 0.0.0.0)
        #[arg(long, env = "LEVY_HOST", default_value = "0.0.0.0")]
        host: String,
        /// Log level: error, warn, info, debug, verbose (default: $LEVY_LOG_LEVEL or info)
        #[arg(long, env = "LEVY_LOG_LEVEL")]
        log_level: Option<String>,
    },
    /// Print a signed session token. Signs with $LEVY_SESSION_SECRET, so the
    /// token is accepted by any server sharing that secret.
    IssueToken {
        #[arg(long)]
        user_id: String,
        /// e.g. ADMIN, LGA_AGENT, VEHICLE_OWNER
        #[arg(long)]
        role: Role,
        /// Lifetime, e.g. 30m, 12h, 7d
        #[arg(long, default_value = "12h")]
        ttl: humantime::Duration,
        /// Token forwarded to the remote API on the caller's behalf
        #[arg(long, default_value = "")]
        upstream_token: String,
        #[arg(long, env = "LEVY_SESSION_SECRET", hide_env_values = true)]
        secret: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let raw_level = match &cli.command {
        Commands::Serve { log_level, .. } => log_level.clone(),
        Commands::IssueToken { .. } => None,
    }
    .or_else(|| std::env::var("LEVY_LOG_LEVEL").ok())
    .unwrap_or_else(|| "info".into());
    let effective_log_level = if raw_level.eq_ignore_ascii_case("verbose") {
        "debug".to_owned()
    } else {
        raw_level
    };

    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&effective_log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            log_level: _,
        } => cmd_serve(host, port).await,

        Commands::IssueToken {
            user_id,
            role,
            ttl,
            upstream_token,
            secret,
        } => cmd_issue_token(user_id, role, ttl, upstream_token, secret),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(host: String, port: u16) -> Result<()> {
    let cfg = levy_server::ServerConfig {
        host,
        port,
        ..Default::default()
    };

    levy_server::run(cfg).await
}

fn cmd_issue_token(
    user_id: String,
    role: Role,
    ttl: humantime::Duration,
    upstream_token: String,
    secret: String,
) -> Result<()> {
    let session = Session {
        user_id,
        role,
        token: upstream_token,
        expires_at: 0,
    };
    let token = issue_token(session, ttl.into(), secret)?;
    println!("{token}");
    Ok(())
}

/// Stamp the expiry and sign. `session.expires_at` is overwritten.
fn issue_token(mut session: Session, ttl: std::time::Duration, secret: String) -> Result<String> {
    if secret.is_empty() {
        anyhow::bail!("LEVY_SESSION_SECRET must not be empty");
    }
    let ttl = i64::try_from(ttl.as_secs()).context("ttl is too large")?;
    session.expires_at = levy_server::now() + ttl;

    let key = SessionKey::new(secret.into_bytes());
    tracing::info!(user_id = %session.user_id, role = %session.role, "issued session token");
    Ok(key.issue(&session))
}
