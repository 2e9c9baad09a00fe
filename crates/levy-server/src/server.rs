use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    commission::CommissionRates,
    gate::{enforce, Gate, GatePolicy},
    handlers::{
        self, auth, dashboard, identity, payments, settings, stickers, transactions, users,
        vehicles, whitelist,
    },
    identity::{IdentityVerifier, RemoteIdentityVerifier, UnconfiguredIdentityVerifier},
    ip_guard::require_whitelisted_ip,
    remote::{RemoteApi, RemotePaths},
    revalidate::Revalidator,
    role::{Capability, Role},
    session::SessionKey,
    store::Store,
    AppState,
};

/// Twelve hours.
pub const DEFAULT_SESSION_TTL: i64 = 12 * 60 * 60;

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub session_secret: Option<String>,
    pub session_ttl: i64,
    pub remote_api_url: Option<String>,
    pub remote_api_secret: Option<String>,
    /// TOML file overriding the remote API path table.
    pub config_path: Option<PathBuf>,
    pub cors_origins: Option<String>,
    pub trust_proxy: bool,
    pub commission: CommissionRates,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let defaults = CommissionRates::default();
        Self {
            host: std::env::var("LEVY_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("LEVY_PORT").unwrap_or(8080),
            data_dir: std::env::var("LEVY_DATA_DIR").ok().map(PathBuf::from),
            session_secret: std::env::var("LEVY_SESSION_SECRET").ok(),
            session_ttl: env_parse("LEVY_SESSION_TTL").unwrap_or(DEFAULT_SESSION_TTL),
            remote_api_url: std::env::var("LEVY_REMOTE_API_URL").ok(),
            remote_api_secret: std::env::var("LEVY_REMOTE_API_SECRET").ok(),
            config_path: std::env::var("LEVY_CONFIG").ok().map(PathBuf::from),
            cors_origins: std::env::var("LEVY_CORS_ORIGINS").ok(),
            trust_proxy: std::env::var("LEVY_TRUST_PROXY")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            commission: CommissionRates {
                rate: env_parse("LEVY_COMMISSION_RATE").unwrap_or(defaults.rate),
                agent_share: env_parse("LEVY_AGENT_SHARE").unwrap_or(defaults.agent_share),
                agency_share: env_parse("LEVY_AGENCY_SHARE").unwrap_or(defaults.agency_share),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Optional on-disk configuration.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    remote_paths: RemotePaths,
}

fn load_remote_paths(path: Option<&Path>) -> Result<RemotePaths> {
    let Some(path) = path else {
        return Ok(RemotePaths::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let file: FileConfig =
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))?;
    Ok(file.remote_paths)
}

/// `dir` if given (created if missing), otherwise the platform data dir.
pub fn resolve_data_dir(dir: Option<&PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(d) => {
            std::fs::create_dir_all(d).context("create data dir")?;
            Ok(d.clone())
        }
        None => crate::dirs::data_dir(),
    }
}

pub async fn run(cfg: ServerConfig) -> Result<()> {
    let data_dir = resolve_data_dir(cfg.data_dir.as_ref())?;
    info!(data_dir = %data_dir.display(), "using data directory");

    let store = Store::open(&data_dir.join("levy.db")).context("open store")?;

    cfg.commission
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid commission rates: {e}"))?;

    let session_key = match &cfg.session_secret {
        Some(secret) => SessionKey::new(secret.as_bytes()),
        None => {
            warn!("LEVY_SESSION_SECRET not set; sessions will not survive a restart");
            SessionKey::generate()
        }
    };

    let remote = match (&cfg.remote_api_url, &cfg.remote_api_secret) {
        (Some(url), Some(secret)) => {
            let paths = load_remote_paths(cfg.config_path.as_deref())?;
            info!(%url, "remote API configured");
            Some(RemoteApi::new(url, secret, paths)?)
        }
        (Some(_), None) => anyhow::bail!("LEVY_REMOTE_API_URL is set but LEVY_REMOTE_API_SECRET is not"),
        _ => {
            warn!("no remote API configured; proxy and identity endpoints will answer 503");
            None
        }
    };

    let identity: Arc<dyn IdentityVerifier> = match &remote {
        Some(api) => Arc::new(RemoteIdentityVerifier::new(api.clone())),
        None => Arc::new(UnconfiguredIdentityVerifier),
    };

    let state = AppState {
        store,
        session_key: Arc::new(session_key),
        session_ttl: cfg.session_ttl,
        remote,
        identity,
        commission: cfg.commission,
        revalidator: Revalidator::default(),
        trust_proxy: cfg.trust_proxy,
    };

    let app = build_router(state).layer(build_cors(cfg.cors_origins.as_deref()));

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port")?;

    info!(%addr, "levy server listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("bind listener")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}

/// Every route, each group behind its gate. CORS is left to the caller.
pub fn build_router(state: AppState) -> Router {
    let gated = |policy: GatePolicy| {
        middleware::from_fn_with_state(
            Gate {
                state: state.clone(),
                policy,
            },
            enforce,
        )
    };
    let can = |cap: Capability| gated(GatePolicy::capability(cap));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/signin", get(handlers::signin))
        .route("/unauthorized", get(handlers::unauthorized));

    let session = Router::new()
        .route("/auth/session", get(auth::current_session))
        .route("/auth/session/refresh", post(auth::refresh_session))
        .route_layer(gated(GatePolicy::authenticated()));

    let dashboard = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route_layer(gated(
            GatePolicy::capability(Capability::ViewDashboard).redirecting(),
        ));

    // ── Vehicles ──
    let view_vehicles = Router::new()
        .route("/vehicles", get(vehicles::list_vehicles))
        .route("/vehicles/{id}", get(vehicles::get_vehicle))
        .route_layer(can(Capability::ViewVehicles));

    let manage_vehicles = Router::new()
        .route("/vehicles", post(vehicles::create_vehicle))
        .route(
            "/vehicles/{id}",
            patch(vehicles::update_vehicle).delete(vehicles::delete_vehicle),
        )
        .route("/vehicles/{id}/net-total", post(vehicles::recalculate_net_total))
        .route_layer(can(Capability::ManageVehicles));

    let virtual_accounts = Router::new()
        .route("/vehicles/virtual-account", post(vehicles::create_virtual_account))
        .route_layer(can(Capability::CreateVirtualAccount));

    // ── Stickers ──
    let attach = Router::new()
        .route("/stickers/attach", post(stickers::attach_sticker))
        .route_layer(can(Capability::AttachSticker));

    let barcodes = Router::new()
        .route("/stickers/barcode", patch(stickers::update_barcode))
        .route_layer(can(Capability::ManageStickers));

    let request_stickers = Router::new()
        .route(
            "/sticker-requests",
            get(stickers::list_sticker_requests).post(stickers::create_sticker_request),
        )
        .route_layer(can(Capability::RequestSticker));

    let approve_stickers = Router::new()
        .route(
            "/sticker-requests/{id}/approve",
            post(stickers::approve_sticker_request),
        )
        .route(
            "/sticker-requests/{id}/reject",
            post(stickers::reject_sticker_request),
        )
        .route("/sticker-requests/{id}", delete(stickers::delete_sticker_request))
        .route_layer(can(Capability::ApproveSticker));

    // ── Users ──
    let users = Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/role", patch(users::change_role))
        .route("/users/{id}/block", post(users::block_user))
        .route("/users/{id}/unblock", post(users::unblock_user))
        .route("/users/{id}/blacklist", post(users::blacklist_user))
        .route_layer(can(Capability::ManageUsers));

    // ── Transactions ──
    let view_transactions = Router::new()
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/{id}", get(transactions::get_transaction))
        .route_layer(can(Capability::ViewTransactions));

    // Owners see their own transactions but not the commission split.
    let quotes = Router::new()
        .route("/transactions/quote", post(transactions::quote))
        .route_layer(gated(
            GatePolicy::capability(Capability::ViewTransactions).reject(&[Role::VehicleOwner]),
        ));

    let manage_transactions = Router::new()
        .route("/transactions", post(transactions::create_transaction))
        .route("/transactions/{id}/status", patch(transactions::update_status))
        .route_layer(can(Capability::ManageTransactions));

    // ── Payment notifications ──
    let ingest = Router::new()
        .route("/payment-notifications", post(payments::ingest_notification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_whitelisted_ip,
        ));

    let notifications = Router::new()
        .route("/payment-notifications", get(payments::list_notifications))
        .route(
            "/payment-notifications/summary",
            get(payments::notification_summary),
        )
        .route_layer(can(Capability::ViewPaymentNotifications));

    // ── Administration ──
    let whitelist = Router::new()
        .route(
            "/whitelisted-ips",
            get(whitelist::list_whitelisted_ips).post(whitelist::create_whitelisted_ip),
        )
        .route("/whitelisted-ips/{id}", delete(whitelist::delete_whitelisted_ip))
        .route_layer(can(Capability::ManageWhitelist));

    let settings = Router::new()
        .route(
            "/vehicle-settings",
            get(settings::list_settings).post(settings::create_setting),
        )
        .route("/vehicle-settings/{id}", patch(settings::update_setting))
        .route_layer(can(Capability::ManageVehicleSettings));

    let identity = Router::new()
        .route("/identity/{identifier}", get(identity::verify_identity))
        .route_layer(can(Capability::VerifyIdentity));

    Router::new()
        .merge(public)
        .merge(session)
        .merge(dashboard)
        .merge(view_vehicles)
        .merge(manage_vehicles)
        .merge(virtual_accounts)
        .merge(attach)
        .merge(barcodes)
        .merge(request_stickers)
        .merge(approve_stickers)
        .merge(users)
        .merge(view_transactions)
        .merge(quotes)
        .merge(manage_transactions)
        .merge(ingest)
        .merge(notifications)
        .merge(whitelist)
        .merge(settings)
        .merge(identity)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    match origins {
        Some(o) => {
            let origins: Vec<_> = o
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            cors.allow_origin(origins)
        }
        None => cors.allow_origin(Any),
    }
}
