use std::path::Path;

use config::{Config, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::GatewayConfig;

/// Load configuration from a file using the config crate.
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<GatewayConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously.
pub fn load_config_sync(config_path: &str) -> Result<GatewayConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let gateway_config: GatewayConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(gateway_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:8080"
public_addr: "gateway.example.com:8080"
services:
  - name: "blog"
    origin: "http://blogs-service:8081"
    paths: ["/blogs", "/comments"]
    auth: true
  - name: "events"
    origin: "http://events-service:8083"
    paths: ["/events"]
auth_overrides:
  "/events": true
"#;

        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.public_addr, "gateway.example.com:8080");
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0].name, "blog");
        assert!(config.services[0].auth);
        assert!(!config.services[1].auth);
        assert_eq!(config.auth_overrides.get("/events"), Some(&true));
        // Defaults fill in what the file omits.
        assert_eq!(config.session.cookie_name, "session_token");
        assert_eq!(config.upstream_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let json_content = r#"
{
  "listen_addr": "127.0.0.1:8080",
  "services": [
    {
      "name": "profiles",
      "origin": "http://profile-service:8084",
      "paths": ["/user/profiles", "/user/profiles/{user_id}"],
      "auth": true
    }
  ],
  "session": {
    "cookie_name": "sid",
    "validate_url": "http://auth-service:8082/validate-session"
  }
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.services[0].paths.len(), 2);
        assert_eq!(config.session.cookie_name, "sid");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_config("/nonexistent/portico.yaml").await;
        assert!(result.is_err());
    }
}
