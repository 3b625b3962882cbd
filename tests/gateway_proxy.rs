//! End-to-end forwarding through the real upstream client against live
//! socket backends bound on ephemeral ports.
use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body as AxumBody,
    extract::RawQuery,
    http::HeaderMap as AxumHeaderMap,
    response::{IntoResponse, Response as AxumResponse},
    routing::get,
};
use http_body_util::BodyExt;
use hyper::{Request, Response, StatusCode, header};
use portico::{
    GatewayHandler, RouteTable, UpstreamClient,
    config::GatewayConfig,
    ports::{
        http_client::HttpClient,
        session::{Identity, SessionError, SessionValidator},
    },
};

struct AcceptAll;

#[async_trait]
impl SessionValidator for AcceptAll {
    async fn validate(&self, _token: &str) -> Result<Identity, SessionError> {
        Ok(Identity {
            user_id: 42,
            is_admin: true,
        })
    }
}

/// Bind a small backend on an ephemeral port. It echoes enough request
/// detail to assert verbatim forwarding, and issues a redirect that points
/// at its own internal address (taken from the Host header the gateway set).
async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route(
            "/blogs/{id}",
            get(
                |headers: AxumHeaderMap, RawQuery(query): RawQuery| async move {
                    let host = headers
                        .get(header::HOST)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    let user = headers
                        .get("X-User-Id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    format!("host={host} user={user} query={}", query.unwrap_or_default())
                },
            ),
        )
        .route(
            "/blogs",
            get(|headers: AxumHeaderMap| async move {
                let host = headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let location = format!("http://{host}/blogs/1");
                AxumResponse::builder()
                    .status(StatusCode::FOUND)
                    .header(header::LOCATION, location)
                    .body(AxumBody::empty())
                    .unwrap()
                    .into_response()
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Reserve an ephemeral port and close it again, so connecting is refused.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn gateway_for(origin: &str) -> GatewayHandler {
    let config = GatewayConfig::builder()
        .public_addr("gateway.test:9999")
        .upstream_timeout_secs(5)
        .service("blog", origin, &["/blogs"], false)
        .build();
    let routes = Arc::new(RouteTable::resolve(&config.services, &config.auth_overrides).unwrap());
    let upstream: Arc<dyn HttpClient> = Arc::new(UpstreamClient::new(5).unwrap());
    GatewayHandler::new(routes, upstream, Arc::new(AcceptAll), Arc::new(config))
}

fn get_request(path: &str) -> Request<AxumBody> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(AxumBody::empty())
        .unwrap()
}

async fn body_string(response: Response<AxumBody>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_forwards_with_host_rewritten_and_query_intact() {
    let addr = spawn_backend().await;
    let gateway = gateway_for(&format!("http://{addr}"));

    let response = gateway
        .handle_request(get_request("/blogs/7?page=2&sort=new"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    // The backend saw its own authority in Host and the untouched query.
    assert_eq!(body, format!("host={addr} user= query=page=2&sort=new"));
}

#[tokio::test]
async fn test_guarded_forward_carries_identity_assertion() {
    let addr = spawn_backend().await;
    let origin = format!("http://{addr}");
    let config = GatewayConfig::builder()
        .public_addr("gateway.test:9999")
        .upstream_timeout_secs(5)
        .service("blog", &origin, &["/blogs"], true)
        .build();
    let routes = Arc::new(RouteTable::resolve(&config.services, &config.auth_overrides).unwrap());
    let upstream: Arc<dyn HttpClient> = Arc::new(UpstreamClient::new(5).unwrap());
    let gateway = GatewayHandler::new(routes, upstream, Arc::new(AcceptAll), Arc::new(config));

    let request = Request::builder()
        .method("GET")
        .uri("/blogs/7")
        .header(header::COOKIE, "session_token=anything")
        .body(AxumBody::empty())
        .unwrap();
    let response = gateway.handle_request(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("user=42"), "backend should see X-User-Id: {body}");
}

#[tokio::test]
async fn test_redirect_location_rewritten_to_public_address() {
    let addr = spawn_backend().await;
    let gateway = gateway_for(&format!("http://{addr}"));

    let response = gateway.handle_request(get_request("/blogs")).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "http://gateway.test:9999/blogs/1"
    );
}

#[tokio::test]
async fn test_unreachable_backend_yields_bad_gateway_and_gateway_survives() {
    let dead_port = closed_port().await;
    let live_addr = spawn_backend().await;

    let config = GatewayConfig::builder()
        .public_addr("gateway.test:9999")
        .upstream_timeout_secs(5)
        .service("dead", &format!("http://127.0.0.1:{dead_port}"), &["/dead"], false)
        .service("blog", &format!("http://{live_addr}"), &["/blogs"], false)
        .build();
    let routes = Arc::new(RouteTable::resolve(&config.services, &config.auth_overrides).unwrap());
    let upstream: Arc<dyn HttpClient> = Arc::new(UpstreamClient::new(5).unwrap());
    let gateway = GatewayHandler::new(routes, upstream, Arc::new(AcceptAll), Arc::new(config));

    let response = gateway.handle_request(get_request("/dead/thing")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // Subsequent requests to healthy targets still work.
    let response = gateway.handle_request(get_request("/blogs/1")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
