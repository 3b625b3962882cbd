pub mod http_client;
pub mod session;

pub use http_client::{HttpClient, ProxyError, ProxyResult};
pub use session::{Identity, SessionError, SessionValidator};
