//! Minimal HTTP client for the levy server's session endpoints.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::liveness::SessionStatus;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{kind}: {message} (HTTP {status})")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user_id: String,
    pub role: String,
    pub expires_at: i64,
    pub expires_at_display: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedSession {
    pub token: String,
    pub role: String,
    pub expires_at: i64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    kind: String,
    message: String,
}

/// Holds the bearer token; refreshing swaps it in place so clones see the
/// new value.
#[derive(Clone)]
pub struct LevyClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<String>>,
}

impl LevyClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: Arc::new(RwLock::new(token.into())),
        })
    }

    pub fn token(&self) -> String {
        match self.token.read() {
            Ok(t) => t.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_token(&self, token: String) {
        match self.token.write() {
            Ok(mut t) => *t = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub async fn session(&self) -> Result<SessionInfo, ClientError> {
        let resp = self
            .http
            .get(format!("{}/auth/session", self.base_url))
            .bearer_auth(self.token())
            .send()
            .await?;
        unwrap_envelope(resp).await
    }

    /// `Unauthenticated` on 401, otherwise the session's expiry.
    pub async fn status(&self) -> Result<SessionStatus, ClientError> {
        match self.session().await {
            Ok(info) => Ok(SessionStatus::Authenticated {
                expires_at: info.expires_at,
            }),
            Err(ClientError::Api { status: 401, .. }) => Ok(SessionStatus::Unauthenticated),
            Err(e) => Err(e),
        }
    }

    /// Exchanges the current token for a fresh one and keeps it.
    pub async fn refresh(&self) -> Result<RefreshedSession, ClientError> {
        let resp = self
            .http
            .post(format!("{}/auth/session/refresh", self.base_url))
            .bearer_auth(self.token())
            .send()
            .await?;
        let refreshed: RefreshedSession = unwrap_envelope(resp).await?;
        self.set_token(refreshed.token.clone());
        Ok(refreshed)
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let envelope: Envelope<T> = resp.json().await.map_err(|e| {
        if status.is_success() {
            ClientError::Unexpected(e.to_string())
        } else {
            ClientError::Api {
                status: status.as_u16(),
                kind: "unknown".into(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned(),
            }
        }
    })?;

    match envelope {
        Envelope {
            success: true,
            data: Some(data),
            ..
        } if status.is_success() => Ok(data),
        Envelope {
            error: Some(err), ..
        } => Err(ClientError::Api {
            status: status.as_u16(),
            kind: err.kind,
            message: err.message,
        }),
        _ if status == StatusCode::OK => {
            Err(ClientError::Unexpected("envelope without data".into()))
        }
        _ => Err(ClientError::Api {
            status: status.as_u16(),
            kind: "unknown".into(),
            message: "request failed".into(),
        }),
    }
}
