use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode, header};

use crate::{
    config::models::SessionConfig,
    ports::{
        http_client::{HttpClient, ProxyError},
        session::{Identity, SessionError, SessionValidator},
    },
};

/// Session validator backed by the external auth service.
///
/// The token is forwarded to the collaborator's validation endpoint in the
/// same cookie the client used; a 2xx answer carries the resolved identity
/// as JSON (`user_id`, `is_admin`). Validation runs per request, never
/// cached.
pub struct AuthServiceValidator {
    client: Arc<dyn HttpClient>,
    config: SessionConfig,
}

impl AuthServiceValidator {
    pub fn new(client: Arc<dyn HttpClient>, config: SessionConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SessionValidator for AuthServiceValidator {
    async fn validate(&self, token: &str) -> Result<Identity, SessionError> {
        let request = Request::builder()
            .method("GET")
            .uri(&self.config.validate_url)
            .header(
                header::COOKIE,
                format!("{}={token}", self.config.cookie_name),
            )
            .body(AxumBody::empty())
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;

        let response = self.client.send_request(request).await.map_err(|e| match e {
            ProxyError::Timeout(secs) => {
                SessionError::Unavailable(format!("validation timed out after {secs}s"))
            }
            other => SessionError::Unavailable(other.to_string()),
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SessionError::Invalid);
        }
        if !status.is_success() {
            return Err(SessionError::Unavailable(format!(
                "validation endpoint returned {status}"
            )));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| SessionError::Unavailable(format!("failed reading identity: {e}")))?
            .to_bytes();

        serde_json::from_slice(&body)
            .map_err(|e| SessionError::Unavailable(format!("malformed identity payload: {e}")))
    }
}
