pub mod api;

use std::sync::Arc;

use axum::Router;
use http::{Method, header::CONTENT_TYPE};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::errors::AppError;
use crate::handlers;
use crate::state::AppState;

/// Assemble the full application: health check, API routes, CORS and security headers.
///
/// Rate limiting needs the peer address and is layered on in `main`.
pub fn create_app(app_state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route(
        "/healthz",
        axum::routing::get(handlers::api::health_check),
    );

    let cors_layer = cors_layer(app_state.config.cors_allowed_origins.as_deref());

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    public_routes
        .merge(api::create_api_router())
        .with_state(app_state)
        .layer(cors_layer)
        .layer(security_headers)
}

/// Add per-IP rate limiting as configured, keyed on the forwarded or peer address.
///
/// Each IP may send `rate_limit_burst_size` requests at once and regains one
/// slot every `1 / rate_limit_requests_per_second` seconds. The router is
/// returned unchanged when limiting is disabled.
pub fn with_rate_limit(router: Router, config: &ServerConfig) -> Result<Router, AppError> {
    if !config.is_rate_limited() {
        info!("Rate limiting disabled (rate >= 100000/s)");
        return Ok(router);
    }

    let governor_config = GovernorConfigBuilder::default()
        .per_nanosecond(replenish_interval_nanos(
            config.rate_limit_requests_per_second,
        ))
        .burst_size(config.rate_limit_burst_size)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "Invalid rate limit: {} requests/s, burst {}",
                config.rate_limit_requests_per_second, config.rate_limit_burst_size
            ))
        })?;

    info!(
        requests_per_second = config.rate_limit_requests_per_second,
        burst_size = config.rate_limit_burst_size,
        "Rate limiting enabled"
    );
    Ok(router.layer(GovernorLayer::new(governor_config)))
}

/// Interval between replenished slots for a sustained `requests_per_second`.
fn replenish_interval_nanos(requests_per_second: u32) -> u64 {
    1_000_000_000 / u64::from(requests_per_second.max(1))
}

fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    match origins {
        Some("*") => base.allow_origin(Any).allow_credentials(false),
        Some(origins) => {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            base.allow_origin(origins).allow_credentials(true)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            // No allow_origin = same-origin only
            base.allow_credentials(false)
        }
    }
}
