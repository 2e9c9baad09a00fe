//! Role gates: a pure decision table plus the axum middleware that renders
//! its outcome.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    envelope::ApiError,
    role::{Capability, Role, RoleSet},
    session::{bearer_token, Session},
    AppState,
};

pub const SIGNIN_PATH: &str = "/signin";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// What to do when a gate refuses a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Redirect(&'static str),
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoSession,
    Role(Role),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Render,
    Redirect(&'static str),
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// `None` admits every role.
    pub allow: Option<RoleSet>,
    /// Always wins over `allow`.
    pub reject: RoleSet,
    pub on_missing: Denial,
    pub on_denied: Denial,
}

impl GatePolicy {
    /// Any signed-in caller.
    pub fn authenticated() -> Self {
        Self {
            allow: None,
            reject: RoleSet::EMPTY,
            on_missing: Denial::Deny,
            on_denied: Denial::Deny,
        }
    }

    /// Admits exactly the roles the capability table grants `cap`.
    pub fn capability(cap: Capability) -> Self {
        Self {
            allow: Some(RoleSet::with_capability(cap)),
            ..Self::authenticated()
        }
    }

    /// Turn `roles` away even where the allow-list would admit them.
    pub fn reject(mut self, roles: &[Role]) -> Self {
        self.reject = RoleSet::of(roles);
        self
    }

    /// Send refused callers to the sign-in and unauthorized pages instead of
    /// answering inline.
    pub fn redirecting(mut self) -> Self {
        self.on_missing = Denial::Redirect(SIGNIN_PATH);
        self.on_denied = Denial::Redirect(UNAUTHORIZED_PATH);
        self
    }

    pub fn decide(&self, session: Option<&Session>, now: i64) -> GateDecision {
        let Some(session) = session.filter(|s| !s.is_expired(now)) else {
            return refuse(self.on_missing, DenyReason::NoSession);
        };

        let role = session.role;
        let admitted = !self.reject.contains(role)
            && self.allow.map_or(true, |allow| allow.contains(role));

        if admitted {
            GateDecision::Render
        } else {
            refuse(self.on_denied, DenyReason::Role(role))
        }
    }
}

fn refuse(denial: Denial, reason: DenyReason) -> GateDecision {
    match denial {
        Denial::Redirect(to) => GateDecision::Redirect(to),
        Denial::Deny => GateDecision::Deny(reason),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Gate {
    pub state: AppState,
    pub policy: GatePolicy,
}

/// Resolves the caller's session and applies the gate. On success the
/// [`Session`] is inserted into request extensions for the handler.
pub async fn enforce(State(gate): State<Gate>, mut request: Request, next: Next) -> Response {
    let now = crate::now();
    let session = bearer_token(request.headers()).and_then(|token| {
        gate.state
            .session_key
            .verify(token, now)
            .map_err(|e| debug!(error = %e, "ignoring session token"))
            .ok()
    });

    match gate.policy.decide(session.as_ref(), now) {
        GateDecision::Render => {
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
        GateDecision::Redirect(to) => Redirect::to(to).into_response(),
        GateDecision::Deny(DenyReason::NoSession) => ApiError::Unauthenticated.into_response(),
        GateDecision::Deny(DenyReason::Role(role)) => {
            debug!(%role, path = %request.uri().path(), "gate denied role");
            ApiError::Forbidden(format!("role {role} may not access this resource"))
                .into_response()
        }
    }
}
