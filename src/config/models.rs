//! Configuration data structures for Portico.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files. They are
//! intentionally serde-friendly and include defaults so that minimal configs remain concise.
//! The whole configuration is loaded once before the listener binds and is immutable for
//! the process lifetime; routing must be stable while requests are in flight.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_addr() -> String {
    "localhost:8080".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_cookie_name() -> String {
    "session_token".to_string()
}

fn default_validate_url() -> String {
    "http://auth-service:8082/validate-session".to_string()
}

/// Methods accepted by parameterized routes when a service does not override them.
pub const DEFAULT_PARAM_METHODS: [&str; 4] = ["GET", "POST", "PATCH", "DELETE"];

/// One backend service: a target origin, the path patterns it owns and its
/// default auth requirement.
///
/// Declaration order in the `services` list is significant: when two patterns
/// of equal length both match a request path, the first-declared service wins.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Logical service name, unique across the configuration.
    pub name: String,
    /// Target origin, an absolute `http://` or `https://` URL (scheme + host + port).
    pub origin: String,
    /// Path patterns owned by this service. Patterns containing a `{segment}`
    /// variable are matched by exact shape and restricted to a method set;
    /// all other patterns are matched by prefix and accept any method.
    pub paths: Vec<String>,
    /// Whether routes of this service require a valid session by default.
    /// Individual patterns can be overridden via `auth_overrides`.
    #[serde(default)]
    pub auth: bool,
    /// Methods accepted by this service's parameterized patterns.
    /// Defaults to GET/POST/PATCH/DELETE when absent.
    #[serde(default)]
    pub param_methods: Option<Vec<String>>,
}

/// How the gateway talks to the external session-validation collaborator.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the opaque session token.
    pub cookie_name: String,
    /// Full URL of the auth collaborator's session-validation endpoint.
    pub validate_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            validate_url: default_validate_url(),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    /// Address the gateway listens on, `IP:PORT`.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Externally visible `host:port` of the gateway, substituted into
    /// redirect `Location` headers that point at an internal target host.
    #[serde(default = "default_public_addr")]
    pub public_addr: String,
    /// Timeout for a single outbound call (backend forward or session
    /// validation), in seconds. One attempt is made per request; no retries.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Backend services, in declaration order.
    pub services: Vec<ServiceConfig>,
    /// Per-pattern auth requirement overrides. Keys must exactly equal a
    /// declared path pattern; an override always supersedes the owning
    /// service's default, in both directions.
    #[serde(default)]
    pub auth_overrides: HashMap<String, bool>,
    #[serde(default)]
    pub session: SessionConfig,
}

impl GatewayConfig {
    /// Create a new gateway configuration builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            public_addr: default_public_addr(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            services: Vec::new(),
            auth_overrides: HashMap::new(),
            session: SessionConfig::default(),
        }
    }
}

/// Builder for `GatewayConfig` to allow for cleaner configuration creation,
/// mainly in tests and embedding scenarios.
#[derive(Default)]
pub struct GatewayConfigBuilder {
    listen_addr: Option<String>,
    public_addr: Option<String>,
    upstream_timeout_secs: Option<u64>,
    services: Vec<ServiceConfig>,
    auth_overrides: HashMap<String, bool>,
    session: Option<SessionConfig>,
}

impl GatewayConfigBuilder {
    /// Set the listen address.
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Set the externally visible gateway address (`host:port`).
    pub fn public_addr(mut self, addr: impl Into<String>) -> Self {
        self.public_addr = Some(addr.into());
        self
    }

    /// Set the outbound call timeout in seconds.
    pub fn upstream_timeout_secs(mut self, secs: u64) -> Self {
        self.upstream_timeout_secs = Some(secs);
        self
    }

    /// Append a service. Order of calls fixes declaration order.
    pub fn service(
        mut self,
        name: impl Into<String>,
        origin: impl Into<String>,
        paths: &[&str],
        auth: bool,
    ) -> Self {
        self.services.push(ServiceConfig {
            name: name.into(),
            origin: origin.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            auth,
            param_methods: None,
        });
        self
    }

    /// Append a fully specified service.
    pub fn service_config(mut self, service: ServiceConfig) -> Self {
        self.services.push(service);
        self
    }

    /// Add an auth override for one declared path pattern.
    pub fn auth_override(mut self, pattern: impl Into<String>, requires_auth: bool) -> Self {
        self.auth_overrides.insert(pattern.into(), requires_auth);
        self
    }

    /// Set the session-validation settings.
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the final `GatewayConfig`.
    pub fn build(self) -> GatewayConfig {
        GatewayConfig {
            listen_addr: self.listen_addr.unwrap_or_else(default_listen_addr),
            public_addr: self.public_addr.unwrap_or_else(default_public_addr),
            upstream_timeout_secs: self
                .upstream_timeout_secs
                .unwrap_or_else(default_upstream_timeout_secs),
            services: self.services,
            auth_overrides: self.auth_overrides,
            session: self.session.unwrap_or_default(),
        }
    }
}
