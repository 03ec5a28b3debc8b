use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{audio, interact};
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// The health check is mounted by [`super::create_app`].
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/interact", post(interact::interact))
        .route("/audio/{filename}", get(audio::download_audio))
        .layer(TraceLayer::new_for_http())
}
