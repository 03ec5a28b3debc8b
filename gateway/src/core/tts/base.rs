use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::core::identity::VoiceId;

#[derive(Debug, Error)]
pub enum TTSError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider not ready: {0}")]
    ProviderNotReady(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),
}

impl From<reqwest::Error> for TTSError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TTSError::Timeout(err.to_string())
        } else if err.is_decode() {
            TTSError::InvalidResponse(err.to_string())
        } else {
            TTSError::NetworkError(err.to_string())
        }
    }
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Engine-specific synthesis request produced by the first phase.
///
/// Two-phase engines fill `payload` with whatever their query endpoint returned.
/// Single-call engines leave it empty and synthesize straight from `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisQuery {
    pub text: String,
    pub voice: VoiceId,
    pub payload: Option<serde_json::Value>,
}

impl SynthesisQuery {
    /// Query that carries only the input, for engines without a query phase.
    pub fn deferred(text: impl Into<String>, voice: VoiceId) -> Self {
        Self {
            text: text.into(),
            voice,
            payload: None,
        }
    }
}

/// Text-to-speech engine reachable by the gateway.
///
/// The protocol is two-phase: build a query from text and voice, then render that
/// query to audio bytes. Engines with a single combined call only implement
/// [`BaseTTS::synthesize`] and inherit the deferred [`BaseTTS::create_query`].
#[async_trait]
pub trait BaseTTS: Send + Sync {
    async fn create_query(&self, text: &str, voice: VoiceId) -> TTSResult<SynthesisQuery> {
        Ok(SynthesisQuery::deferred(text, voice))
    }

    /// Render a query to raw audio bytes (WAV).
    async fn synthesize(&self, query: &SynthesisQuery) -> TTSResult<Bytes>;

    /// Whether requests are actually forwarded to an engine.
    fn is_ready(&self) -> bool {
        true
    }

    fn get_provider_info(&self) -> serde_json::Value;
}

pub type BoxedTTS = Arc<dyn BaseTTS>;
