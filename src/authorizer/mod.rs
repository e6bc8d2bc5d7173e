//! Bearer token authorizer
//!
//! Separate entry point from the router. The expected secret is fetched once
//! per cold start; every request is then a pure comparison against it.
//!
//! Lifecycle: `Uninitialized -> SecretLoaded -> Ready`, or `Degraded` when the
//! secret cannot be loaded. A degraded authorizer denies everything.

pub mod policy;
pub mod secret_store;

pub use policy::AuthorizerResponse;
pub use secret_store::SecretStore;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Prefix stripped from presented tokens
const BEARER_PREFIX: &str = "Bearer ";

/// Policy effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request authorization outcome, never cached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub principal: String,
    pub effect: Effect,
    pub resource: String,
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        self.effect == Effect::Allow
    }
}

/// Authorizer event from the gateway
///
/// TOKEN authorizers carry `authorizationToken`; REQUEST authorizers carry
/// the raw headers instead.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub authorization_token: Option<String>,
    #[serde(default)]
    pub method_arn: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl AuthorizerRequest {
    /// The presented token, before prefix stripping
    pub fn presented_token(&self) -> Option<&str> {
        self.authorization_token.as_deref().or_else(|| {
            self.headers.as_ref().and_then(|headers| {
                headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("authorization"))
                    .map(|(_, value)| value.as_str())
            })
        })
    }
}

/// Lifecycle phase, for health reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizerPhase {
    Uninitialized,
    SecretLoaded,
    Ready,
    Degraded,
}

impl AuthorizerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::SecretLoaded => "secret_loaded",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        }
    }
}

/// Authorizer lifecycle state
pub enum AuthorizerState {
    Uninitialized,
    SecretLoaded(SecretString),
    Ready(SecretString),
    Degraded { reason: String },
}

impl fmt::Debug for AuthorizerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::SecretLoaded(_) => f.write_str("SecretLoaded([REDACTED])"),
            Self::Ready(_) => f.write_str("Ready([REDACTED])"),
            Self::Degraded { reason } => f.debug_struct("Degraded").field("reason", reason).finish(),
        }
    }
}

impl AuthorizerState {
    /// Record the fetched secret; an empty secret degrades the authorizer
    pub fn on_secret(self, secret: SecretString) -> Self {
        match self {
            Self::Uninitialized => {
                if secret_store::expose(&secret).is_empty() {
                    Self::Degraded {
                        reason: "secret is empty".to_string(),
                    }
                } else {
                    Self::SecretLoaded(secret)
                }
            }
            other => other,
        }
    }

    /// Complete start-up
    pub fn on_ready(self) -> Self {
        match self {
            Self::SecretLoaded(secret) => Self::Ready(secret),
            other => other,
        }
    }

    /// Record a failed secret fetch
    pub fn on_failure(self, reason: impl Into<String>) -> Self {
        match self {
            Self::Ready(_) => self,
            _ => Self::Degraded {
                reason: reason.into(),
            },
        }
    }

    pub fn phase(&self) -> AuthorizerPhase {
        match self {
            Self::Uninitialized => AuthorizerPhase::Uninitialized,
            Self::SecretLoaded(_) => AuthorizerPhase::SecretLoaded,
            Self::Ready(_) => AuthorizerPhase::Ready,
            Self::Degraded { .. } => AuthorizerPhase::Degraded,
        }
    }
}

/// Static-secret bearer token authorizer
#[derive(Debug)]
pub struct TokenAuthorizer {
    state: AuthorizerState,
    principal_id: String,
}

impl TokenAuthorizer {
    /// An authorizer that has not loaded its secret (denies everything)
    pub fn uninitialized(principal_id: impl Into<String>) -> Self {
        Self {
            state: AuthorizerState::Uninitialized,
            principal_id: principal_id.into(),
        }
    }

    /// An authorizer that is ready with the given secret
    pub fn with_secret(principal_id: impl Into<String>, secret: SecretString) -> Self {
        Self {
            state: AuthorizerState::Uninitialized.on_secret(secret).on_ready(),
            principal_id: principal_id.into(),
        }
    }

    /// Fetch the expected secret once and settle the lifecycle state
    ///
    /// Never fails: a fetch error leaves the authorizer `Degraded`.
    pub async fn cold_start(
        store: &dyn SecretStore,
        secret_id: &str,
        principal_id: impl Into<String>,
    ) -> Self {
        let state = match store.fetch(secret_id).await {
            Ok(secret) => AuthorizerState::Uninitialized.on_secret(secret).on_ready(),
            Err(e) => AuthorizerState::Uninitialized.on_failure(e.to_string()),
        };

        match &state {
            AuthorizerState::Degraded { reason } => tracing::error!(
                secret_id = %secret_id,
                reason = %reason,
                "Authorizer secret unavailable, running fail-closed"
            ),
            _ => tracing::info!(secret_id = %secret_id, "Authorizer secret loaded"),
        }

        Self {
            state,
            principal_id: principal_id.into(),
        }
    }

    pub fn phase(&self) -> AuthorizerPhase {
        self.state.phase()
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Decide a gateway authorizer event
    pub fn authorize(&self, request: &AuthorizerRequest) -> AuthDecision {
        self.authorize_token(request.presented_token(), &request.method_arn)
    }

    /// Decide a presented token for a resource
    pub fn authorize_token(&self, presented: Option<&str>, resource: &str) -> AuthDecision {
        let effect = match &self.state {
            AuthorizerState::Ready(secret) => match presented {
                Some(token) => {
                    let token = strip_bearer(token);
                    if constant_time_eq(token, secret_store::expose(secret)) {
                        Effect::Allow
                    } else {
                        tracing::warn!(resource = %resource, "Bearer token mismatch");
                        Effect::Deny
                    }
                }
                None => {
                    tracing::warn!(resource = %resource, "No bearer token presented");
                    Effect::Deny
                }
            },
            other => {
                tracing::error!(
                    resource = %resource,
                    phase = other.phase().as_str(),
                    "Authorizer not ready, denying request (fail-closed)"
                );
                Effect::Deny
            }
        };

        AuthDecision {
            principal: self.principal_id.clone(),
            effect,
            resource: resource.to_string(),
        }
    }
}

/// Strip an optional `Bearer ` prefix
pub fn strip_bearer(token: &str) -> &str {
    token.strip_prefix(BEARER_PREFIX).unwrap_or(token)
}

/// Constant-time string comparison
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
