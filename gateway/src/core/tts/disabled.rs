//! Text-only stand-in installed when no speech engine is reachable.

use async_trait::async_trait;
use bytes::Bytes;

use super::base::{BaseTTS, SynthesisQuery, TTSError, TTSResult};
use crate::core::identity::VoiceId;

/// Engine that refuses every request without touching the network.
#[derive(Debug, Clone)]
pub struct DisabledTTS {
    reason: String,
}

impl DisabledTTS {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl BaseTTS for DisabledTTS {
    async fn create_query(&self, _text: &str, _voice: VoiceId) -> TTSResult<SynthesisQuery> {
        Err(TTSError::ProviderNotReady(self.reason.clone()))
    }

    async fn synthesize(&self, _query: &SynthesisQuery) -> TTSResult<Bytes> {
        Err(TTSError::ProviderNotReady(self.reason.clone()))
    }

    fn is_ready(&self) -> bool {
        false
    }

    fn get_provider_info(&self) -> serde_json::Value {
        serde_json::json!({
            "provider": "disabled",
            "reason": self.reason,
        })
    }
}
