//! Client for the remote payment/core API that owns ledger state, virtual
//! accounts, stickers and net-total recalculation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::ApiError;

pub const API_SECRET_HEADER: &str = "api-secret";

/// Path table for the remote API, relative to its base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotePaths {
    pub attach_sticker: String,
    pub create_virtual_account: String,
    pub update_sticker_barcode: String,
    pub recalculate_net_total: String,
    pub verify_identity: String,
}

impl Default for RemotePaths {
    fn default() -> Self {
        Self {
            attach_sticker: "/vehicle/attach-sticker".into(),
            create_virtual_account: "/vehicle/create-virtual-account".into(),
            update_sticker_barcode: "/sticker/update-barcode".into(),
            recalculate_net_total: "/vehicle/recalculate-net-total".into(),
            verify_identity: "/identity/verify".into(),
        }
    }
}

#[derive(Clone)]
pub struct RemoteApi {
    client: reqwest::Client,
    base_url: String,
    secret: String,
    pub paths: Arc<RemotePaths>,
}

impl RemoteApi {
    pub fn new(base_url: &str, secret: &str, paths: RemotePaths) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build remote API client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            secret: secret.to_owned(),
            paths: Arc::new(paths),
        })
    }

    pub async fn post(&self, path: &str, bearer: Option<&str>, body: &impl Serialize) -> Result<Value, ApiError> {
        self.call(Method::POST, path, bearer, Some(body)).await
    }

    pub async fn patch(&self, path: &str, bearer: Option<&str>, body: &impl Serialize) -> Result<Value, ApiError> {
        self.call(Method::PATCH, path, bearer, Some(body)).await
    }

    /// One attempt, no retries. Non-2xx answers keep their status.
    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(API_SECRET_HEADER, &self.secret);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%url, error = %e, "remote API unreachable");
            ApiError::Unavailable("remote API is unavailable".into())
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        debug!(%method, %url, %status, "remote API call");

        if status.is_success() {
            Ok(unwrap_data(payload))
        } else {
            Err(ApiError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&payload)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("upstream error").to_owned()),
            })
        }
    }
}

/// Remote answers are sometimes wrapped in `{data: ...}`.
fn unwrap_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

fn upstream_message(payload: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .map(str::to_owned)
}
