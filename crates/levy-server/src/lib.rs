pub mod commission;
pub mod dirs;
pub mod envelope;
pub mod extract;
pub mod format;
pub mod gate;
pub mod handlers;
pub mod identity;
pub mod ip_guard;
pub mod remote;
pub mod revalidate;
pub mod role;
pub mod server;
pub mod session;
pub mod store;
pub mod validation;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared application state threaded through axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: store::Store,
    /// Signs and verifies session tokens.
    pub session_key: Arc<session::SessionKey>,
    /// Lifetime of a refreshed session, in seconds.
    pub session_ttl: i64,
    /// Remote payment/core API (absent when not configured).
    pub remote: Option<remote::RemoteApi>,
    pub identity: Arc<dyn identity::IdentityVerifier>,
    /// Rates applied to transactions recorded through this service.
    pub commission: commission::CommissionRates,
    pub revalidator: revalidate::Revalidator,
    /// Honour `X-Forwarded-For` when resolving the caller's IP.
    pub trust_proxy: bool,
}

impl AppState {
    pub fn remote(&self) -> Result<&remote::RemoteApi, envelope::ApiError> {
        self.remote
            .as_ref()
            .ok_or_else(|| envelope::ApiError::Unavailable("remote API is not configured".into()))
    }
}

pub use server::{build_router, resolve_data_dir, run, ServerConfig};

/// Current unix time in seconds.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
