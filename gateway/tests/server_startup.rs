//! Server Startup Tests
//!
//! Tests for server lifecycle, configuration loading, and startup behavior.
//! These tests verify that the server can start correctly under various conditions.

use std::net::TcpListener;
use std::time::Duration;

use axum::{Router, body::Body, http::Request};
use tempfile::TempDir;
use tokio::time::timeout;
use tower::util::ServiceExt;

use concierge_gateway::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
///
/// Speech is disabled and audio lands in `audio_dir`.
fn create_minimal_config(port: u16, audio_dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        public_base_url: format!("http://127.0.0.1:{port}"),
        tts_enabled: false,
        ..Default::default()
    };
    config.audio.dir = audio_dir.path().join("audio");
    config
}

/// Find an available port for testing
fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Test that the server can start with minimal configuration (no engine, no database)
#[tokio::test]
async fn test_minimal_config_boot() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_minimal_config(find_available_port(), &temp_dir);

    let app_state = AppState::from_config(config).await.unwrap();
    let app = routes::create_app(app_state);

    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

/// Test that a text-only gateway still answers /interact
#[tokio::test]
async fn test_text_only_interact() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_minimal_config(find_available_port(), &temp_dir);
    let app_state = AppState::from_config(config).await.unwrap();

    let app = Router::new()
        .merge(routes::api::create_api_router())
        .with_state(app_state);

    let request_body = serde_json::json!({
        "UserId": "550e8400-e29b-41d4-a716-446655440000",
        "UserName": "Alice",
        "Message": "Hello",
    });
    let request = Request::builder()
        .method("POST")
        .uri("/interact")
        .header("content-type", "application/json")
        .body(Body::from(request_body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

/// Test that the server accepts real connections once bound
#[tokio::test]
async fn test_serves_over_tcp() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_minimal_config(0, &temp_dir);
    let app = routes::create_app(AppState::from_config(config).await.unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = timeout(
        Duration::from_secs(5),
        client
            .post(format!("http://{addr}/interact"))
            .json(&serde_json::json!({
                "UserId": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
                "UserName": "Bob",
                "Message": "hi",
            }))
            .send(),
    )
    .await
    .expect("server did not answer in time")
    .unwrap();

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "(AI response) Hello, Bob.");
    assert_eq!(body["audio_url"], "");

    server.abort();
}

/// Test that the server can be created with various rate limit configurations
#[tokio::test]
async fn test_rate_limit_configurations() {
    let temp_dir = TempDir::new().unwrap();

    let mut config = create_minimal_config(find_available_port(), &temp_dir);
    config.rate_limit_requests_per_second = 100;
    config.rate_limit_burst_size = 50;
    let app_state = AppState::from_config(config).await.unwrap();
    assert!(app_state.config.is_rate_limited());

    // Rate limiting disabled (high value)
    let mut config2 = create_minimal_config(find_available_port(), &temp_dir);
    config2.rate_limit_requests_per_second = 100000;
    let app_state2 = AppState::from_config(config2).await.unwrap();
    assert!(!app_state2.config.is_rate_limited());
}

/// Build the full app with the rate limiter as `main` does
async fn rate_limited_app(rps: u32, burst: u32, temp_dir: &TempDir) -> Router {
    let mut config = create_minimal_config(find_available_port(), temp_dir);
    config.rate_limit_requests_per_second = rps;
    config.rate_limit_burst_size = burst;
    let app_state = AppState::from_config(config).await.unwrap();
    routes::with_rate_limit(routes::create_app(app_state.clone()), &app_state.config).unwrap()
}

async fn healthz_from(app: &Router, ip: &str) -> axum::http::StatusCode {
    let request = Request::builder()
        .uri("/healthz")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

/// Test that traffic below the configured rate is never rejected
#[tokio::test]
async fn test_rate_limit_admits_traffic_below_rate() {
    let temp_dir = TempDir::new().unwrap();
    let app = rate_limited_app(60, 10, &temp_dir).await;

    // 20 requests at ~20/s: twice the burst, a third of the rate.
    let mut statuses = Vec::new();
    for _ in 0..20 {
        statuses.push(healthz_from(&app, "203.0.113.7").await);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(
        statuses.iter().all(|s| *s == axum::http::StatusCode::OK),
        "statuses: {statuses:?}"
    );
}

/// Test that a burst above the configured size is rejected per IP
#[tokio::test]
async fn test_rate_limit_rejects_excess_burst() {
    let temp_dir = TempDir::new().unwrap();
    let app = rate_limited_app(1, 2, &temp_dir).await;

    assert_eq!(healthz_from(&app, "198.51.100.1").await, axum::http::StatusCode::OK);
    assert_eq!(healthz_from(&app, "198.51.100.1").await, axum::http::StatusCode::OK);
    assert_eq!(
        healthz_from(&app, "198.51.100.1").await,
        axum::http::StatusCode::TOO_MANY_REQUESTS
    );

    // Other callers have their own quota.
    assert_eq!(healthz_from(&app, "198.51.100.2").await, axum::http::StatusCode::OK);
}

/// Test that CORS configuration is applied correctly
#[tokio::test]
async fn test_cors_configurations() {
    let temp_dir = TempDir::new().unwrap();

    let mut config = create_minimal_config(find_available_port(), &temp_dir);
    config.cors_allowed_origins = Some("*".to_string());
    let app = routes::create_app(AppState::from_config(config).await.unwrap());

    let request = Request::builder()
        .uri("/healthz")
        .header("origin", "https://kiosk.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    // Specific origins
    let mut config2 = create_minimal_config(find_available_port(), &temp_dir);
    config2.cors_allowed_origins =
        Some("http://localhost:3000,https://kiosk.example.com".to_string());
    let app2 = routes::create_app(AppState::from_config(config2).await.unwrap());

    let request = Request::builder()
        .uri("/healthz")
        .header("origin", "https://kiosk.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app2.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://kiosk.example.com"
    );

    let request = Request::builder()
        .uri("/healthz")
        .header("origin", "https://evil.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app2.oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}

/// Test that the server correctly parses addresses
#[tokio::test]
async fn test_address_parsing() {
    let temp_dir = TempDir::new().unwrap();
    let port = find_available_port();
    let config = create_minimal_config(port, &temp_dir);

    let address = config.address();
    assert!(address.contains("127.0.0.1"));
    assert!(address.contains(&port.to_string()));
}

/// Test that multiple AppState instances can be created concurrently
#[tokio::test]
async fn test_concurrent_app_state_creation() {
    let temp_dir = TempDir::new().unwrap();

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            let config = create_minimal_config(find_available_port(), &temp_dir);
            tokio::spawn(async move { AppState::from_config(config).await.is_ok() })
        })
        .collect();

    for task in tasks {
        assert!(task.await.expect("Task should complete successfully"));
    }
}

/// Test that a YAML config file drives startup
#[tokio::test]
async fn test_config_file_boot() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!(
            "server:\n  port: 5055\ntts:\n  enabled: false\nvisitors:\n  promotion_threshold: 2\naudio:\n  dir: \"{}\"\n",
            temp_dir.path().join("audio").display()
        ),
    )
    .unwrap();

    let config = ServerConfig::from_file(&config_path).unwrap();
    assert_eq!(config.port, 5055);
    assert_eq!(config.promotion_threshold, 2);

    let app_state = AppState::from_config(config).await.unwrap();
    assert_eq!(app_state.interactions.policy().threshold(), 2);
}

/// Test that unknown routes return 404
#[tokio::test]
async fn test_unknown_route() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_minimal_config(find_available_port(), &temp_dir);
    let app = routes::create_app(AppState::from_config(config).await.unwrap());

    let request = Request::builder()
        .uri("/voices")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}
