use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;

use crate::ports::http_client::{HttpClient, ProxyError, ProxyResult};

/// Outbound HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Sets the outbound `Host` header from the target URI (many backend
///   frameworks dispatch virtual hosts by header)
/// * Streams request and response bodies without buffering, so backpressure
///   from the client connection propagates to the backend connection
/// * Bounds every call by the configured timeout
///
/// This adapter is intentionally minimal; retries / circuit breaking are
/// deliberately absent from this layer.
pub struct UpstreamClient {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
    timeout_secs: u64,
}

impl UpstreamClient {
    /// Create a new upstream client with the given per-call timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        for cert in native_certs.certs {
            if root_cert_store.add(cert).is_err() {
                tracing::warn!("Failed to add native certificate to rustls RootCertStore");
            }
        }
        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        Ok(Self {
            client,
            timeout_secs,
        })
    }

    /// Set the outbound `Host` header to the target's `host[:port]`.
    fn set_host_header(req: &mut Request<AxumBody>) -> ProxyResult<()> {
        let Some(host_str) = req.uri().host() else {
            return Err(ProxyError::InvalidRequest(
                "Outgoing URI has no host".to_string(),
            ));
        };

        let host_header_val = if let Some(port) = req.uri().port() {
            HeaderValue::from_str(&format!("{host_str}:{}", port.as_u16()))
        } else {
            HeaderValue::from_str(host_str)
        }
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid host header: {e}")))?;

        req.headers_mut().insert(header::HOST, host_header_val);
        Ok(())
    }
}

#[async_trait]
impl HttpClient for UpstreamClient {
    async fn send_request(&self, mut req: Request<AxumBody>) -> ProxyResult<Response<AxumBody>> {
        Self::set_host_header(&mut req)?;

        let (mut parts, body) = req.into_parts();
        parts.version = Version::HTTP_11;

        let method_for_error_log = parts.method.clone();
        let uri_for_error_log = parts.uri.clone();
        tracing::debug!(method = %parts.method, uri = %parts.uri, "dispatching upstream request");

        let outgoing_request = Request::from_parts(parts, body);
        let timeout_duration = Duration::from_secs(self.timeout_secs);

        match timeout(timeout_duration, self.client.request(outgoing_request)).await {
            Ok(Ok(response)) => {
                let (mut parts, hyper_body) = response.into_parts();

                // Remove Transfer-Encoding since the body is re-framed by the
                // server side of the gateway.
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Ok(Err(e)) => {
                tracing::error!(
                    method = %method_for_error_log,
                    uri = %uri_for_error_log,
                    error = %e,
                    "upstream request failed"
                );
                Err(ProxyError::Connection(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
            Err(_) => {
                tracing::error!(
                    method = %method_for_error_log,
                    uri = %uri_for_error_log,
                    timeout_secs = self.timeout_secs,
                    "upstream request timed out"
                );
                Err(ProxyError::Timeout(self.timeout_secs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upstream_client_creation() {
        let client = UpstreamClient::new(30);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_set_host_header_includes_port() {
        let mut req = Request::builder()
            .uri("http://blogs-service:8081/blogs")
            .body(AxumBody::empty())
            .unwrap();
        UpstreamClient::set_host_header(&mut req).unwrap();
        assert_eq!(req.headers().get(header::HOST).unwrap(), "blogs-service:8081");
    }

    #[tokio::test]
    async fn test_set_host_header_without_port() {
        let mut req = Request::builder()
            .uri("http://blogs-service/blogs")
            .body(AxumBody::empty())
            .unwrap();
        UpstreamClient::set_host_header(&mut req).unwrap();
        assert_eq!(req.headers().get(header::HOST).unwrap(), "blogs-service");
    }

    #[tokio::test]
    async fn test_hostless_uri_rejected() {
        let mut req = Request::builder()
            .uri("/relative/path")
            .body(AxumBody::empty())
            .unwrap();
        let result = UpstreamClient::set_host_header(&mut req);
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
    }
}
