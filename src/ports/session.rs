use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Identity resolved by the external auth collaborator for a valid session
/// token. The gateway never creates or stores sessions; it only asserts this
/// identity to downstream services via request headers.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub user_id: u64,
    #[serde(default)]
    pub is_admin: bool,
}

impl Identity {
    /// Role string asserted to backends in `X-User-Role`.
    pub fn role(&self) -> &'static str {
        if self.is_admin { "admin" } else { "user" }
    }
}

/// Errors from session validation. An invalid token is a client error; an
/// unreachable validator is an upstream failure and must not be reported as
/// a 401, since the caller's credentials were never evaluated.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session token rejected")]
    Invalid,

    #[error("session validation unavailable: {0}")]
    Unavailable(String),
}

/// SessionValidator defines the port for the external session-validation
/// capability. Each request is validated independently; no caching, so a
/// revoked session is rejected on the very next request.
#[async_trait]
pub trait SessionValidator: Send + Sync + 'static {
    async fn validate(&self, token: &str) -> Result<Identity, SessionError>;
}
