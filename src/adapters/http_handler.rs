use std::sync::Arc;

use axum::body::Body as AxumBody;
use hyper::{
    HeaderMap, Request, Response, StatusCode, Uri,
    header::{self, HeaderValue},
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::models::GatewayConfig,
    core::{rewrite, route_table::RouteEntry, RouteTable},
    ports::{
        http_client::HttpClient,
        session::{Identity, SessionError, SessionValidator},
    },
};

/// Request handler for the Portico gateway.
///
/// Holds only immutable, startup-resolved state behind `Arc`s, so concurrent
/// request tasks share it without locks. Per request: route lookup, auth
/// gate, then forwarding. Every outcome of the state machine maps to a
/// response here; this method never fails outward.
pub struct GatewayHandler {
    routes: Arc<RouteTable>,
    upstream: Arc<dyn HttpClient>,
    sessions: Arc<dyn SessionValidator>,
    config: Arc<GatewayConfig>,
}

enum GateRejection {
    MissingToken,
    InvalidToken,
    ValidatorUnavailable(String),
}

impl GatewayHandler {
    pub fn new(
        routes: Arc<RouteTable>,
        upstream: Arc<dyn HttpClient>,
        sessions: Arc<dyn SessionValidator>,
        config: Arc<GatewayConfig>,
    ) -> Self {
        Self {
            routes,
            upstream,
            sessions,
            config,
        }
    }

    /// Main entry point: route, guard, forward.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            request.id = %request_id,
            http.method = %req.method(),
            http.path = %req.uri().path(),
        );
        self.dispatch(req).instrument(span).await
    }

    async fn dispatch(&self, mut req: Request<AxumBody>) -> Response<AxumBody> {
        let path = req.uri().path().to_string();
        let method = req.method().clone();

        let Some(entry) = self.routes.find(&path, &method) else {
            tracing::debug!("no matching route");
            return error_response(StatusCode::NOT_FOUND, "No route configured for this path");
        };
        let entry = entry.clone();

        // Backends trust these headers as gateway assertions, so client
        // copies must never survive the hop.
        strip_identity(req.headers_mut());

        if entry.requires_auth {
            match self.authenticate(req.headers()).await {
                Ok(identity) => attach_identity(req.headers_mut(), &identity),
                Err(GateRejection::MissingToken) => {
                    tracing::debug!(pattern = %entry.pattern, "no session token on guarded route");
                    return error_response(StatusCode::UNAUTHORIZED, "Authentication required");
                }
                Err(GateRejection::InvalidToken) => {
                    tracing::debug!(pattern = %entry.pattern, "session token rejected");
                    return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired session");
                }
                Err(GateRejection::ValidatorUnavailable(reason)) => {
                    tracing::error!(pattern = %entry.pattern, %reason, "session validation unavailable");
                    return error_response(StatusCode::BAD_GATEWAY, "Session validation unavailable");
                }
            }
        }

        self.forward(&entry, req).await
    }

    /// Auth gate: rejection here short-circuits before any backend call.
    async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, GateRejection> {
        let cookie_name = &self.config.session.cookie_name;
        let Some(token) = session_cookie(headers, cookie_name) else {
            return Err(GateRejection::MissingToken);
        };

        match self.sessions.validate(&token).await {
            Ok(identity) => Ok(identity),
            Err(SessionError::Invalid) => Err(GateRejection::InvalidToken),
            Err(SessionError::Unavailable(reason)) => {
                Err(GateRejection::ValidatorUnavailable(reason))
            }
        }
    }

    /// Forward the request to the matched target origin and rewrite any
    /// redirect Location pointing at the internal host.
    async fn forward(&self, entry: &RouteEntry, mut req: Request<AxumBody>) -> Response<AxumBody> {
        let authority = rewrite::host_with_port(&entry.target);
        if authority.is_empty() {
            tracing::error!(pattern = %entry.pattern, target = %entry.target, "target origin has no host");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid target origin");
        }

        let path_and_query = req
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let backend_uri: Uri = match format!(
            "{}://{authority}{path_and_query}",
            entry.target.scheme()
        )
        .parse()
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(pattern = %entry.pattern, target = %entry.target, error = %e, "failed to construct backend URI");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid target origin");
            }
        };

        let request_path = req.uri().path().to_string();
        *req.uri_mut() = backend_uri;

        match self.upstream.send_request(req).await {
            Ok(mut response) => {
                let status = response.status();
                rewrite::rewrite_redirect_headers(
                    status,
                    response.headers_mut(),
                    &entry.target,
                    &self.config.public_addr,
                );
                tracing::info!(
                    target = %entry.target,
                    http.status_code = status.as_u16(),
                    "forwarded"
                );
                response
            }
            Err(e) => {
                tracing::error!(
                    target = %entry.target,
                    path = %request_path,
                    error = %e,
                    "backend request failed"
                );
                error_response(StatusCode::BAD_GATEWAY, "Backend unreachable")
            }
        }
    }
}

impl Clone for GatewayHandler {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            upstream: self.upstream.clone(),
            sessions: self.sessions.clone(),
            config: self.config.clone(),
        }
    }
}

/// Extract the named cookie's value from a Cookie header.
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Drop identity assertions supplied by the client. Only the gateway may
/// set them, and only after validating the session.
fn strip_identity(headers: &mut HeaderMap) {
    headers.remove("X-User-Id");
    headers.remove("X-User-Role");
}

/// Assert the validated identity to the backend, which trusts the gateway.
fn attach_identity(headers: &mut HeaderMap, identity: &Identity) {
    if let Ok(value) = HeaderValue::from_str(&identity.user_id.to_string()) {
        headers.insert("X-User-Id", value);
    }
    headers.insert("X-User-Role", HeaderValue::from_static(identity.role()));
}

fn error_response(status: StatusCode, message: &str) -> Response<AxumBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(AxumBody::from(message.to_string()))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(AxumBody::from(message.to_string()));
            *fallback.status_mut() = status;
            fallback
        })
}
