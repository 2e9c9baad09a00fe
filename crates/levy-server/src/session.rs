use axum::http::HeaderMap;
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

use crate::role::Role;

type HmacSha256 = Hmac<Sha256>;

/// Request-scoped caller context, injected by the gate middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub role: Role,
    /// Bearer token forwarded to the remote API.
    pub token: String,
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed session token")]
    Malformed,
    #[error("session signature mismatch")]
    BadSignature,
    #[error("session expired")]
    Expired,
}

/// Shared secret used to sign and verify session tokens.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKey(Vec<u8>);

impl SessionKey {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Random key for deployments that did not configure one. Tokens signed
    /// with it do not survive a restart.
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 32] = rand::thread_rng().gen();
        Self(bytes.to_vec())
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }

    /// Encode `session` as `hex(json).hex(hmac)`.
    pub fn issue(&self, session: &Session) -> String {
        let payload = serde_json::to_vec(session).expect("session serialises to JSON");
        let sig = self.sign(&payload);
        format!("{}.{}", hex::encode(&payload), hex::encode(sig))
    }

    pub fn verify(&self, token: &str, now: i64) -> Result<Session, SessionError> {
        let (payload_hex, sig_hex) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let payload = hex::decode(payload_hex).map_err(|_| SessionError::Malformed)?;
        let sig = hex::decode(sig_hex).map_err(|_| SessionError::Malformed)?;

        if !constant_time_eq(&self.sign(&payload), &sig) {
            return Err(SessionError::BadSignature);
        }

        let session: Session =
            serde_json::from_slice(&payload).map_err(|_| SessionError::Malformed)?;
        if session.is_expired(now) {
            return Err(SessionError::Expired);
        }
        Ok(session)
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
