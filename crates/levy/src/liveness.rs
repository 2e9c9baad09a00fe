//! Keeps a signed-in session alive by refreshing it on a fixed interval.
//!
//! [`watch`] decides up front whether there is anything to keep alive. A
//! missing or expired session yields a redirect to the sign-in page; a live
//! one yields a [`LivenessGuard`] whose background task refreshes the session
//! every interval until the guard is dropped.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::client::{ClientError, LevyClient};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
/// Shorter intervals, zero included, are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);
pub const SIGNIN_LOCATION: &str = "/signin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticated { expires_at: i64 },
}

#[async_trait]
pub trait SessionRefresher: Send + Sync + 'static {
    async fn refresh(&self) -> Result<(), ClientError>;
}

/// Refreshes through the server's `/auth/session/refresh` endpoint.
pub struct HttpSessionRefresher {
    client: LevyClient,
}

impl HttpSessionRefresher {
    pub fn new(client: LevyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionRefresher for HttpSessionRefresher {
    async fn refresh(&self) -> Result<(), ClientError> {
        let refreshed = self.client.refresh().await?;
        info!(expires_at = refreshed.expires_at, "session refreshed");
        Ok(())
    }
}

#[derive(Debug)]
pub enum LivenessStart {
    Redirect {
        notice: String,
        location: &'static str,
    },
    Watching(LivenessGuard),
}

/// Owns the refresh task. Dropping it stops the refreshes.
#[derive(Debug)]
pub struct LivenessGuard {
    task: JoinHandle<()>,
}

impl LivenessGuard {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn watch(
    status: SessionStatus,
    refresher: Arc<dyn SessionRefresher>,
    interval: Duration,
) -> LivenessStart {
    let expires_at = match status {
        SessionStatus::Unauthenticated => {
            return LivenessStart::Redirect {
                notice: "please sign in".into(),
                location: SIGNIN_LOCATION,
            }
        }
        SessionStatus::Authenticated { expires_at } => expires_at,
    };
    if expires_at <= now() {
        return LivenessStart::Redirect {
            notice: "session expired".into(),
            location: SIGNIN_LOCATION,
        };
    }

    let interval = interval.max(MIN_INTERVAL);
    let task = tokio::spawn(async move {
        // First refresh one full interval after mount.
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = refresher.refresh().await {
                debug!(error = %e, "session refresh failed");
            }
        }
    });
    LivenessStart::Watching(LivenessGuard { task })
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
