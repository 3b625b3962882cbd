use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
};

use http::Method;
use url::Url;

use crate::config::models::{GatewayConfig, ServiceConfig, SessionConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types. A gateway with a broken map must not serve
/// traffic, so every variant here is fatal at startup.
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Duplicate service name '{name}'")]
    DuplicateService { name: String },

    #[error("Route conflict detected: {message}")]
    RouteConflict { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Gateway configuration validator
pub struct GatewayConfigValidator;

impl GatewayConfigValidator {
    /// Validate the entire gateway configuration, aggregating every problem
    /// found rather than stopping at the first one.
    pub fn validate(config: &GatewayConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_public_address(&config.public_addr) {
            errors.push(e);
        }

        if config.services.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "services".to_string(),
            });
        } else {
            let mut seen_names = HashSet::new();
            for service in &config.services {
                if !seen_names.insert(service.name.as_str()) {
                    errors.push(ValidationError::DuplicateService {
                        name: service.name.clone(),
                    });
                }
                if let Err(mut service_errors) = Self::validate_service(service) {
                    errors.append(&mut service_errors);
                }
            }

            errors.extend(Self::check_pattern_conflicts(config));
            errors.extend(Self::check_override_keys(config));
        }

        if let Err(e) = Self::validate_session_config(&config.session) {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:8080' or '0.0.0.0:8080')"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// The public address is substituted into Location headers verbatim, so
    /// it must be a bare `host[:port]`, not a URL.
    fn validate_public_address(address: &str) -> ValidationResult<()> {
        if address.is_empty() {
            return Err(ValidationError::MissingField {
                field: "public_addr".to_string(),
            });
        }
        if address.contains("://") || address.contains('/') {
            return Err(ValidationError::InvalidField {
                field: "public_addr".to_string(),
                message: format!("Must be 'host:port' without scheme or path, got '{address}'"),
            });
        }
        Ok(())
    }

    /// Validate a single service entry.
    fn validate_service(service: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if service.name.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "service name".to_string(),
            });
        }

        if let Err(e) = Self::validate_origin(&service.origin, &service.name) {
            errors.push(e);
        }

        if service.paths.is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("service '{}' paths", service.name),
                message: "Each service must own at least one path pattern".to_string(),
            });
        }

        for path in &service.paths {
            if !path.starts_with('/') {
                errors.push(ValidationError::InvalidField {
                    field: format!("service '{}' path '{path}'", service.name),
                    message: "Path patterns must start with '/'".to_string(),
                });
            }
        }

        if let Some(methods) = &service.param_methods {
            for method in methods {
                if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
                    errors.push(ValidationError::InvalidField {
                        field: format!("service '{}' param_methods", service.name),
                        message: format!("'{method}' is not a valid HTTP method"),
                    });
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate that a target origin is an absolute http(s) URL with a host.
    fn validate_origin(origin: &str, service_name: &str) -> ValidationResult<()> {
        let url = Url::parse(origin).map_err(|e| ValidationError::InvalidField {
            field: format!("service '{service_name}' origin"),
            message: format!("'{origin}' is not a valid URL: {e}"),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidField {
                field: format!("service '{service_name}' origin"),
                message: format!("'{origin}' must use http or https"),
            });
        }

        if url.host_str().is_none() {
            return Err(ValidationError::InvalidField {
                field: format!("service '{service_name}' origin"),
                message: format!("'{origin}' has no host"),
            });
        }

        Ok(())
    }

    /// No two differently-configured entries may claim the same literal
    /// pattern. Identically-configured duplicates are tolerated here and
    /// collapsed (with a warning) at route resolution.
    fn check_pattern_conflicts(config: &GatewayConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut claims: HashMap<&str, (&ServiceConfig, bool)> = HashMap::new();

        for service in &config.services {
            for path in &service.paths {
                let requires_auth = config
                    .auth_overrides
                    .get(path)
                    .copied()
                    .unwrap_or(service.auth);
                match claims.get(path.as_str()) {
                    None => {
                        claims.insert(path, (service, requires_auth));
                    }
                    Some((first, first_auth)) => {
                        if first.origin != service.origin || *first_auth != requires_auth {
                            errors.push(ValidationError::RouteConflict {
                                message: format!(
                                    "pattern '{path}' is claimed by services '{}' and '{}' with different configuration",
                                    first.name, service.name
                                ),
                            });
                        }
                    }
                }
            }
        }

        errors
    }

    /// Every override key must exactly equal a declared pattern; a key that
    /// matches nothing would silently never apply.
    fn check_override_keys(config: &GatewayConfig) -> Vec<ValidationError> {
        let declared: HashSet<&str> = config
            .services
            .iter()
            .flat_map(|s| s.paths.iter().map(String::as_str))
            .collect();

        config
            .auth_overrides
            .keys()
            .filter(|key| !declared.contains(key.as_str()))
            .map(|key| ValidationError::InvalidField {
                field: format!("auth_overrides '{key}'"),
                message: "Override key does not match any declared path pattern".to_string(),
            })
            .collect()
    }

    fn validate_session_config(session: &SessionConfig) -> ValidationResult<()> {
        if session.cookie_name.is_empty() {
            return Err(ValidationError::MissingField {
                field: "session.cookie_name".to_string(),
            });
        }

        let url =
            Url::parse(&session.validate_url).map_err(|e| ValidationError::InvalidField {
                field: "session.validate_url".to_string(),
                message: format!("'{}' is not a valid URL: {e}", session.validate_url),
            })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidField {
                field: "session.validate_url".to_string(),
                message: format!("'{}' must use http or https", session.validate_url),
            });
        }

        Ok(())
    }

    /// Format multiple validation errors into a readable message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        let error_messages: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(i, e)| format!("  {}. {e}", i + 1))
            .collect();

        format!(
            "Found {} configuration error(s):\n{}",
            errors.len(),
            error_messages.join("\n")
        )
    }
}
