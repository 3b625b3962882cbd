//! Route resolution: from static configuration to an immutable routing table.
//!
//! The `RouteTable` is built once at startup and shared by reference across
//! request handlers. It provides:
//! * One `RouteEntry` per (service, path pattern) pair, with the effective
//!   auth requirement (override beats service default)
//! * Exact-shape matching for parameterized patterns, restricted to an
//!   explicit method set
//! * Longest-prefix matching for everything else, first-declared wins on ties
//!
//! This layer deliberately avoids I/O and only manipulates in-memory data so
//! it remains fast and easily testable in isolation.
use std::collections::HashMap;

use http::Method;
use url::Url;

use crate::config::models::{DEFAULT_PARAM_METHODS, ServiceConfig};

/// Errors surfaced while turning the configured service list into a routing
/// table. All of them abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("service '{service}' has an unparsable origin '{origin}': {source}")]
    InvalidOrigin {
        service: String,
        origin: String,
        source: url::ParseError,
    },

    #[error("pattern '{pattern}' resolves to conflicting route entries")]
    ConflictingPattern { pattern: String },

    #[error("service '{service}' declares invalid method '{method}'")]
    InvalidMethod { service: String, method: String },

    #[error("invalid parameterized pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// One resolved route: a path pattern mapped to a target origin and an
/// effective auth requirement. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub pattern: String,
    pub target: Url,
    pub requires_auth: bool,
    /// `Some` for parameterized patterns, which only accept these methods.
    /// `None` for prefix patterns, which forward any method unchanged.
    pub allowed_methods: Option<Vec<Method>>,
}

/// The routing table consulted per request. Construction is a pure function
/// of the service list and the override table, so resolving the same
/// configuration twice yields an identical table.
pub struct RouteTable {
    /// Prefix-matched entries, longest pattern first. The sort is stable, so
    /// equal-length patterns keep declaration order (first-declared wins).
    prefix_entries: Vec<RouteEntry>,
    param_router: matchit::Router<usize>,
    param_entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Build the routing table from the configured services and the auth
    /// override table.
    ///
    /// Effective auth per pattern: `overrides[pattern]` when present, else
    /// the owning service's default. Override keys match by exact string
    /// equality with the declared pattern, never by prefix.
    pub fn resolve(
        services: &[ServiceConfig],
        overrides: &HashMap<String, bool>,
    ) -> Result<Self, ResolveError> {
        let mut prefix_entries: Vec<RouteEntry> = Vec::new();
        let mut param_entries: Vec<RouteEntry> = Vec::new();
        let mut claimed: HashMap<String, RouteEntry> = HashMap::new();

        for service in services {
            let target =
                Url::parse(&service.origin).map_err(|source| ResolveError::InvalidOrigin {
                    service: service.name.clone(),
                    origin: service.origin.clone(),
                    source,
                })?;
            let param_methods = Self::param_methods(service)?;

            for pattern in &service.paths {
                let requires_auth = overrides
                    .get(pattern)
                    .copied()
                    .unwrap_or(service.auth);

                let entry = RouteEntry {
                    pattern: pattern.clone(),
                    target: target.clone(),
                    requires_auth,
                    allowed_methods: pattern
                        .contains('{')
                        .then(|| param_methods.clone()),
                };

                if let Some(existing) = claimed.get(pattern) {
                    if *existing == entry {
                        tracing::warn!(
                            pattern = %pattern,
                            service = %service.name,
                            "duplicate route pattern, keeping first declaration"
                        );
                        continue;
                    }
                    return Err(ResolveError::ConflictingPattern {
                        pattern: pattern.clone(),
                    });
                }
                claimed.insert(pattern.clone(), entry.clone());

                if entry.allowed_methods.is_some() {
                    param_entries.push(entry);
                } else {
                    prefix_entries.push(entry);
                }
            }
        }

        // Stable sort: longest pattern first, declaration order preserved
        // among equals.
        prefix_entries.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));

        let mut param_router = matchit::Router::new();
        for (index, entry) in param_entries.iter().enumerate() {
            param_router
                .insert(entry.pattern.clone(), index)
                .map_err(|e| ResolveError::InvalidPattern {
                    pattern: entry.pattern.clone(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self {
            prefix_entries,
            param_router,
            param_entries,
        })
    }

    /// Find the single best-matching entry for an inbound path and method.
    ///
    /// Parameterized patterns match by exact path shape and take precedence;
    /// a shape match with a method outside the allowed set is terminal
    /// (`None`, a 404) rather than falling through to prefix routes. Exact
    /// literal matches beat shorter prefixes because the matching prefix of
    /// maximal length is the pattern equal to the path itself.
    pub fn find(&self, path: &str, method: &Method) -> Option<&RouteEntry> {
        if let Ok(matched) = self.param_router.at(path) {
            let entry = &self.param_entries[*matched.value];
            let allowed = entry
                .allowed_methods
                .as_ref()
                .is_none_or(|methods| methods.contains(method));
            return allowed.then_some(entry);
        }

        self.prefix_entries
            .iter()
            .find(|entry| Self::prefix_matches(&entry.pattern, path))
    }

    /// All resolved entries, prefix entries first.
    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.prefix_entries.iter().chain(self.param_entries.iter())
    }

    pub fn len(&self) -> usize {
        self.prefix_entries.len() + self.param_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A pattern matches any path sharing it as a raw string prefix, so
    /// `/blogs` matches `/blogs`, `/blogs/7` and `/blogsfeed` alike. Who owns
    /// a path is decided by pattern length, not segment boundaries.
    fn prefix_matches(pattern: &str, path: &str) -> bool {
        path.starts_with(pattern)
    }

    fn param_methods(service: &ServiceConfig) -> Result<Vec<Method>, ResolveError> {
        let names: Vec<String> = match &service.param_methods {
            Some(methods) => methods.clone(),
            None => DEFAULT_PARAM_METHODS.iter().map(|m| m.to_string()).collect(),
        };

        names
            .iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    ResolveError::InvalidMethod {
                        service: service.name.clone(),
                        method: name.clone(),
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::models::GatewayConfig;

    fn table(config: &GatewayConfig) -> RouteTable {
        RouteTable::resolve(&config.services, &config.auth_overrides).unwrap()
    }

    fn sample_config() -> GatewayConfig {
        GatewayConfig::builder()
            .service(
                "blog",
                "http://blogs-service:8081",
                &["/blogs", "/comments"],
                true,
            )
            .service(
                "events",
                "http://events-service:8083",
                &["/admin/events", "/events"],
                false,
            )
            .service(
                "profiles",
                "http://profile-service:8084",
                &[
                    "/user/profiles",
                    "/user/profiles/{user_id}",
                    "/user/profiles/{user_id}/follow",
                ],
                true,
            )
            .auth_override("/admin/events", true)
            .build()
    }

    #[test]
    fn test_prefix_resolves_to_owning_service() {
        let config = sample_config();
        let routes = table(&config);

        let entry = routes.find("/blogs/7/comments", &Method::GET).unwrap();
        assert_eq!(entry.target.as_str(), "http://blogs-service:8081/");
        assert_eq!(entry.pattern, "/blogs");

        let entry = routes.find("/events", &Method::GET).unwrap();
        assert_eq!(entry.target.host_str(), Some("events-service"));
    }

    #[test]
    fn test_longest_prefix_wins() {
        let config = sample_config();
        let routes = table(&config);

        // "/admin/events" and "/events" both exist; the longer one owns the
        // admin subtree.
        let entry = routes.find("/admin/events/3", &Method::DELETE).unwrap();
        assert_eq!(entry.pattern, "/admin/events");
    }

    #[test]
    fn test_prefix_is_raw_string_match() {
        let config = sample_config();
        let routes = table(&config);
        // "/blogsfeed" shares the "/blogs" prefix as a raw string, so it
        // routes to the blog origin even without a segment separator.
        let entry = routes.find("/blogsfeed", &Method::GET).unwrap();
        assert_eq!(entry.pattern, "/blogs");
        assert_eq!(entry.target.host_str(), Some("blogs-service"));
        assert!(routes.find("/blogs/feed", &Method::GET).is_some());
    }

    #[test]
    fn test_unconfigured_path_has_no_match() {
        let config = sample_config();
        let routes = table(&config);
        assert!(routes.find("/nope", &Method::GET).is_none());
    }

    #[test]
    fn test_override_wins_over_default_false() {
        let config = sample_config();
        let routes = table(&config);
        // events defaults to auth=false; /admin/events is overridden to true.
        let entry = routes.find("/admin/events", &Method::GET).unwrap();
        assert!(entry.requires_auth);
        let entry = routes.find("/events", &Method::GET).unwrap();
        assert!(!entry.requires_auth);
    }

    #[test]
    fn test_override_wins_over_default_true() {
        let config = GatewayConfig::builder()
            .service("blog", "http://blogs-service:8081", &["/blogs"], true)
            .auth_override("/blogs", false)
            .build();
        let routes = table(&config);
        assert!(!routes.find("/blogs", &Method::GET).unwrap().requires_auth);
    }

    #[test]
    fn test_override_key_is_exact_not_prefix() {
        let config = GatewayConfig::builder()
            .service(
                "events",
                "http://events-service:8083",
                &["/events", "/events/archive"],
                false,
            )
            .auth_override("/events", true)
            .build();
        let routes = table(&config);
        // The override names "/events" only; "/events/archive" keeps the
        // service default even though "/events" is a string prefix of it.
        assert!(routes.find("/events", &Method::GET).unwrap().requires_auth);
        let archive = routes.find("/events/archive", &Method::GET).unwrap();
        assert_eq!(archive.pattern, "/events/archive");
        assert!(!archive.requires_auth);
    }

    #[test]
    fn test_parameterized_route_matches_by_shape() {
        let config = sample_config();
        let routes = table(&config);

        let entry = routes.find("/user/profiles/42", &Method::GET).unwrap();
        assert_eq!(entry.pattern, "/user/profiles/{user_id}");
        assert!(entry.requires_auth);

        let entry = routes
            .find("/user/profiles/42/follow", &Method::POST)
            .unwrap();
        assert_eq!(entry.pattern, "/user/profiles/{user_id}/follow");
    }

    #[test]
    fn test_parameterized_route_rejects_unlisted_method() {
        let config = sample_config();
        let routes = table(&config);
        // PUT is not in the default method set; the shape match is terminal,
        // so nothing else claims the path.
        assert!(routes.find("/user/profiles/42", &Method::PUT).is_none());
        assert!(routes.find("/user/profiles/42", &Method::PATCH).is_some());
    }

    #[test]
    fn test_unparameterized_sibling_still_prefix_matched() {
        let config = sample_config();
        let routes = table(&config);
        // No parameterized pattern covers two trailing segments here, so the
        // "/user/profiles" prefix route takes it, any method allowed.
        let entry = routes
            .find("/user/profiles/42/followers", &Method::PUT)
            .unwrap();
        assert_eq!(entry.pattern, "/user/profiles");
    }

    #[test]
    fn test_custom_param_method_set() {
        let mut config = sample_config();
        config.services[2].param_methods = Some(vec!["get".to_string()]);
        let routes = table(&config);
        assert!(routes.find("/user/profiles/42", &Method::GET).is_some());
        assert!(routes.find("/user/profiles/42", &Method::POST).is_none());
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let config = sample_config();
        let first = table(&config);
        let second = table(&config);
        let first_entries: Vec<_> = first.entries().cloned().collect();
        let second_entries: Vec<_> = second.entries().cloned().collect();
        assert_eq!(first_entries, second_entries);
    }

    #[test]
    fn test_identical_duplicate_collapsed_to_first() {
        let config = GatewayConfig::builder()
            .service("uploads-a", "http://profile-service:8084", &["/uploads"], false)
            .service("uploads-b", "http://profile-service:8084", &["/uploads"], false)
            .build();
        let routes = table(&config);
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_conflicting_duplicate_is_an_error() {
        let config = GatewayConfig::builder()
            .service("a", "http://a:1", &["/shared"], false)
            .service("b", "http://b:2", &["/shared"], false)
            .build();
        let result = RouteTable::resolve(&config.services, &config.auth_overrides);
        assert!(matches!(
            result,
            Err(ResolveError::ConflictingPattern { .. })
        ));
    }

    #[test]
    fn test_unparsable_origin_is_an_error() {
        let config = GatewayConfig::builder()
            .service("bad", "::not-a-url::", &["/x"], false)
            .build();
        let result = RouteTable::resolve(&config.services, &config.auth_overrides);
        assert!(matches!(result, Err(ResolveError::InvalidOrigin { .. })));
    }
}
