//! Identity verification: resolve a national identifier to a profile.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::envelope::ApiError;
use crate::remote::RemoteApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProfile {
    pub identifier: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

/// `Ok(None)` means the identifier has no match. Callers do not retry.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn lookup(&self, identifier: &str) -> Result<Option<IdentityProfile>, IdentityError>;
}

/// Verifies against the remote API using only the service secret.
pub struct RemoteIdentityVerifier {
    api: RemoteApi,
}

impl RemoteIdentityVerifier {
    pub fn new(api: RemoteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl IdentityVerifier for RemoteIdentityVerifier {
    async fn lookup(&self, identifier: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        let path = self.api.paths.verify_identity.clone();
        match self.api.post(&path, None, &json!({ "identifier": identifier })).await {
            Ok(value) if value.is_null() => Ok(None),
            Ok(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| IdentityError::Unavailable(format!("unexpected response: {e}"))),
            Err(ApiError::Upstream { status: 404, .. }) => Ok(None),
            Err(e) => Err(IdentityError::Unavailable(e.to_string())),
        }
    }
}

/// Fixed in-memory directory for development and tests.
#[derive(Default)]
pub struct StaticIdentityVerifier {
    profiles: HashMap<String, IdentityProfile>,
}

impl StaticIdentityVerifier {
    pub fn new(profiles: impl IntoIterator<Item = IdentityProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.identifier.clone(), p))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn lookup(&self, identifier: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        Ok(self.profiles.get(identifier.trim()).cloned())
    }
}

/// Used when no remote API is configured.
pub struct UnconfiguredIdentityVerifier;

#[async_trait]
impl IdentityVerifier for UnconfiguredIdentityVerifier {
    async fn lookup(&self, _identifier: &str) -> Result<Option<IdentityProfile>, IdentityError> {
        Err(IdentityError::Unavailable(
            "no identity service is configured".into(),
        ))
    }
}
