//! Portico - a request-routing reverse proxy gateway.
//!
//! Portico is the single entry point for a set of independent backend HTTP
//! services. It maps incoming request paths to backend target origins,
//! decides per path whether a valid session is required, and forwards the
//! request while rewriting host-dependent metadata in the response. The
//! gateway holds no business state of its own.
//!
//! # Features
//! - Path-based routing: exact and longest-prefix matching over an immutable,
//!   startup-resolved route table
//! - Parameterized routes (e.g. `/user/profiles/{user_id}`) matched by exact
//!   shape and restricted to an explicit method set
//! - Per-pattern auth overrides that supersede a service's default
//!   requirement, in both directions
//! - Session validation against an external auth collaborator, per request,
//!   with identity assertion headers for downstream services
//! - Streaming reverse proxying with `Host` rewriting and redirect
//!   `Location` rewriting so clients never see internal addresses
//! - Configuration validation that refuses to serve on a broken routing map
//! - Structured tracing via `tracing`
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use portico::{config::GatewayConfig, core::RouteTable};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg: GatewayConfig = portico::config::loader::load_config("portico.yaml").await?;
//! let routes = Arc::new(RouteTable::resolve(&cfg.services, &cfg.auth_overrides)?);
//! // You would normally wire this into the provided GatewayHandler adapter (see binary crate)
//! # Ok(()) }
//! ```
//!
//! # Architecture
//! The crate separates **ports** (traits) from **adapters** (implementations)
//! while keeping routing and rewriting logic inside `core`. End users should
//! prefer the re-exports documented below instead of reaching into internal
//! modules directly.
//!
//! # Error Handling
//! All fallible APIs return `eyre::Result<T>` or a domain specific error
//! type. Configuration problems are fatal at startup; request-time failures
//! map to 401/404/502/500 at the HTTP boundary.
//!
//! # Concurrency
//! The route table is an immutable value constructed once at startup and
//! shared by reference, so request handling takes no locks.
// Re-export public modules with explicit visibility controls
pub mod config;
pub mod ports;
pub mod tracing_setup;

// These modules are implementation details and should not be directly used by users
pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{AuthServiceValidator, GatewayHandler, UpstreamClient},
    core::{RouteEntry, RouteTable},
    ports::{http_client::HttpClient, session::SessionValidator},
};
