use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::{Router, extract::Request, routing::any};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use portico::{
    AuthServiceValidator, GatewayHandler, RouteTable, UpstreamClient,
    config::{GatewayConfig, GatewayConfigValidator, loader::load_config},
    ports::{http_client::HttpClient, session::SessionValidator},
    tracing_setup,
};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "portico.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "portico.yaml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "portico.yaml")]
        config: String,
    },
    /// Start the gateway server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "portico.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let (command, config_path) = match args.command {
        Some(Commands::Validate { config }) => ("validate", config),
        Some(Commands::Init { config }) => ("init", config),
        Some(Commands::Serve { config }) => ("serve", config),
        None => ("serve", args.config), // Default to serve with config from args
    };

    match command {
        "validate" => return validate_config_command(&config_path).await,
        "init" => return init_config_command(&config_path).await,
        "serve" => serve(&config_path).await,
        _ => unreachable!(),
    }
}

async fn serve(config_path: &str) -> Result<()> {
    tracing_setup::init_tracing().map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Loading configuration from {config_path}");
    let config: GatewayConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    // A gateway with a broken map must not serve traffic.
    GatewayConfigValidator::validate(&config)
        .map_err(|e| eyre!("Configuration rejected: {e}"))?;

    let config = Arc::new(config);
    let routes = Arc::new(
        RouteTable::resolve(&config.services, &config.auth_overrides)
            .context("Failed to resolve route table")?,
    );

    for entry in routes.entries() {
        tracing::info!(
            pattern = %entry.pattern,
            target = %entry.target,
            requires_auth = entry.requires_auth,
            methods = ?entry.allowed_methods,
            "configured route"
        );
    }

    let upstream: Arc<dyn HttpClient> = Arc::new(
        UpstreamClient::new(config.upstream_timeout_secs)
            .context("Failed to create upstream HTTP client")?,
    );
    let sessions: Arc<dyn SessionValidator> = Arc::new(AuthServiceValidator::new(
        upstream.clone(),
        config.session.clone(),
    ));

    let handler = Arc::new(GatewayHandler::new(
        routes.clone(),
        upstream,
        sessions,
        config.clone(),
    ));

    let make_request_route = |handler: Arc<GatewayHandler>| {
        any(move |req: Request| {
            let handler = handler.clone();
            async move { handler.handle_request(req).await }
        })
    };

    let app = Router::new()
        .route("/{*path}", make_request_route(handler.clone()))
        .route("/", make_request_route(handler.clone()))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!(
        "Portico gateway listening on {} ({} routes, public address {})",
        addr,
        routes.len(),
        config.public_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Portico gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            let route_count: usize = config.services.iter().map(|s| s.paths.len()).sum();
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr);
            println!("   • Public Address: {}", config.public_addr);
            println!("   • Services: {}", config.services.len());
            println!("   • Route Patterns: {route_count}");
            println!("   • Auth Overrides: {}", config.auth_overrides.len());
            println!();
            println!("🎉 Configuration is valid and ready to use!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Ensure all origins start with http:// or https://");
            println!("   • Verify listen address format (e.g., '0.0.0.0:8080')");
            println!("   • Make sure every auth_overrides key matches a declared path");
            println!("   • Give each service a unique name and at least one path");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Portico Gateway Configuration

# The address the gateway listens on
listen_addr: "0.0.0.0:8080"

# Externally visible host:port, substituted into redirect Location headers
public_addr: "localhost:8080"

# Timeout for a single outbound call, in seconds
upstream_timeout_secs: 30

# How session tokens are validated (external auth collaborator)
session:
  cookie_name: "session_token"
  validate_url: "http://auth-service:8082/validate-session"

# Backend services. Declaration order breaks ties between equal-length
# path patterns. Patterns with a {segment} variable are matched by exact
# shape and restricted to GET/POST/PATCH/DELETE unless param_methods says
# otherwise; all other patterns are matched by prefix.
services:
  - name: "blog"
    origin: "http://blogs-service:8081"
    paths: ["/blogs", "/comments"]
    auth: true

  - name: "auth"
    origin: "http://auth-service:8082"
    paths:
      - "/login"
      - "/register"
      - "/profile"
      - "/update-user"
      - "/validate-admin"
      - "/validate-session"
    auth: false

  - name: "events"
    origin: "http://events-service:8083"
    paths: ["/admin/events", "/events", "/uploads/events"]
    auth: false

  - name: "profiles"
    origin: "http://profile-service:8084"
    paths:
      - "/user/profiles"
      - "/user/profiles/{user_id}"
      - "/user/profiles/{user_id}/follow"
    auth: true

  - name: "attractions"
    origin: "http://attraction-service:8085"
    paths: ["/admin/attractions", "/attractions"]
    auth: false

  - name: "review"
    origin: "http://review-service:8086"
    paths: ["/reviews"]
    auth: true

  - name: "uploads"
    origin: "http://profile-service:8084"
    paths: ["/uploads"]
    auth: false

  - name: "plans"
    origin: "http://plan-service:8087"
    paths:
      - "/api/plans"
      - "/api/templates"
      - "/api/templates/create-plan"
    auth: true

# Per-pattern auth overrides. Keys must exactly equal a declared path
# pattern; an override beats the owning service's default either way.
auth_overrides:
  "/admin/events": true
  "/admin/attractions": true
  "/attractions": true
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'portico serve --config {config_path}' to start the gateway");
    Ok(())
}
