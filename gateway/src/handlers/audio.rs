use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::core::audio_store::{AudioStoreError, is_valid_audio_filename};
use crate::errors::AppError;
use crate::state::AppState;

const CONTENT_TYPE: &str = "audio/wav";

/// Serve a synthesized audio file by name.
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if !is_valid_audio_filename(&filename) {
        info!(filename = %filename, "Rejected audio download with invalid filename");
        return Err(AudioStoreError::InvalidFilename(filename).into());
    }

    let body = state.audio_store().get(&filename).await?;
    debug!(filename = %filename, size = body.len(), "Serving audio file");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    if let Ok(len) = HeaderValue::from_str(&body.len().to_string()) {
        headers.insert(header::CONTENT_LENGTH, len);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((StatusCode::OK, headers, body).into_response())
}
