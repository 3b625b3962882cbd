use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for outbound HTTP operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    /// Error when connection to backend fails
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error when request times out
    #[error("Timeout error after {0} seconds")]
    Timeout(u64),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for outbound HTTP operations
pub type ProxyResult<T> = Result<T, ProxyError>;

/// HttpClient defines the port (interface) for making HTTP requests to
/// backends. A single attempt is made per call; retry policy, if any,
/// belongs to a higher-level collaborator.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to a backend server, streaming the body in both
    /// directions.
    async fn send_request(&self, req: Request<AxumBody>) -> ProxyResult<Response<AxumBody>>;
}
