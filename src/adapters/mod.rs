pub mod http_client;
pub mod http_handler;
pub mod session;

/// Re-export commonly used types from adapters
pub use http_client::UpstreamClient;
pub use http_handler::GatewayHandler;
pub use session::AuthServiceValidator;
