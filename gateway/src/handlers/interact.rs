use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::identity::VisitorId;
use crate::errors::AppResult;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InteractRequest {
    /// Caller-supplied visitor identifier (UUID)
    pub user_id: VisitorId,
    /// Display name as the caller knows it
    pub user_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractResponse {
    pub message: String,
    /// Public URL of the spoken reply, empty when no audio was produced
    pub audio_url: String,
}

/// Handle one visitor message and reply with text and optional audio.
pub async fn interact(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InteractRequest>,
) -> AppResult<Json<InteractResponse>> {
    info!(
        visitor_id = %request.user_id,
        message_len = request.message.len(),
        "Interaction received"
    );

    let outcome = state
        .interactions
        .handle(request.user_id, &request.user_name, &request.message)
        .await?;

    Ok(Json(InteractResponse {
        message: outcome.message,
        audio_url: outcome.audio_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_pascal_case() {
        let request: InteractRequest = serde_json::from_str(
            r#"{"UserId":"550e8400-e29b-41d4-a716-446655440000","UserName":"Alice","Message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(
            request.user_id.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(request.user_name, "Alice");
        assert_eq!(request.message, "hi");
    }

    #[test]
    fn test_request_rejects_invalid_uuid() {
        let result: Result<InteractRequest, _> =
            serde_json::from_str(r#"{"UserId":"nope","UserName":"Alice","Message":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_field_names() {
        let body = serde_json::to_value(InteractResponse {
            message: "hello".to_string(),
            audio_url: String::new(),
        })
        .unwrap();
        assert_eq!(body["message"], "hello");
        assert_eq!(body["audio_url"], "");
    }
}
