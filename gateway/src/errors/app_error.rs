use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::core::audio_store::AudioStoreError;
use crate::core::identity::StoreError;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Identity storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("Audio storage failed: {0}")]
    Audio(#[from] AudioStoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Audio(AudioStoreError::InvalidFilename(_)) => StatusCode::BAD_REQUEST,
            AppError::Audio(AudioStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Audio(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the client. Backend details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Failed to access visitor records".to_string(),
            AppError::Audio(AudioStoreError::InvalidFilename(_)) => {
                "Invalid audio filename".to_string()
            }
            AppError::Audio(AudioStoreError::NotFound(name)) => {
                format!("Audio file not found: {name}")
            }
            AppError::Audio(_) => "Failed to retrieve audio from storage".to_string(),
            AppError::Configuration(_) => "Server misconfigured".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::VisitorId;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::from(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(StoreError::MemberNotFound(VisitorId::new(uuid::Uuid::nil())))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(AudioStoreError::InvalidFilename("../x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AudioStoreError::NotFound("voice_x.wav".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AudioStoreError::Configuration("bad".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_storage_details_are_not_exposed() {
        let err = AppError::from(StoreError::Backend("password authentication failed".into()));
        assert!(!err.public_message().contains("password"));
    }

    #[test]
    fn test_into_response_status() {
        let response =
            AppError::from(AudioStoreError::InvalidFilename("../x.wav".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
