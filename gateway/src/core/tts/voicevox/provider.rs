//! VOICEVOX engine client.
//!
//! # API Reference
//!
//! - `GET /version` - engine version, used as the startup probe
//! - `POST /audio_query?text=..&speaker=..` - build an audio query (JSON)
//! - `POST /synthesis?speaker=..` - render an audio query to `audio/wav`
//! - `POST /initialize_speaker?speaker=..&skip_reinit=true` - preload a speaker model

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::config::{ProsodyOverrides, VoicevoxConfig};
use crate::core::identity::VoiceId;
use crate::core::tts::base::{BaseTTS, SynthesisQuery, TTSError, TTSResult};

/// VOICEVOX engine speaking over its local HTTP API.
pub struct VoicevoxTTS {
    client: reqwest::Client,
    base_url: Url,
    config: VoicevoxConfig,
}

impl VoicevoxTTS {
    pub fn new(config: VoicevoxConfig) -> TTSResult<Self> {
        config.validate().map_err(TTSError::InvalidConfiguration)?;

        let mut base_url = Url::parse(&config.engine_url)
            .map_err(|e| TTSError::InvalidConfiguration(e.to_string()))?;
        // Keep any path prefix when joining endpoint names.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                TTSError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn config(&self) -> &VoicevoxConfig {
        &self.config
    }

    fn endpoint(&self, name: &str) -> TTSResult<Url> {
        self.base_url
            .join(name)
            .map_err(|e| TTSError::InvalidConfiguration(format!("Invalid endpoint {name}: {e}")))
    }

    /// Ask the engine for its version. Any failure means the engine is unusable.
    pub async fn probe(&self) -> TTSResult<String> {
        let response = self.client.get(self.endpoint("version")?).send().await?;
        let response = ensure_success(response, "version").await?;
        let version = response.text().await?;
        Ok(version.trim().trim_matches('"').to_string())
    }

    /// Preload the model for `voice` so the first real request is not slowed down.
    pub async fn initialize_speaker(&self, voice: VoiceId) -> TTSResult<()> {
        let response = self
            .client
            .post(self.endpoint("initialize_speaker")?)
            .query(&[
                ("speaker", voice.to_string()),
                ("skip_reinit", "true".to_string()),
            ])
            .send()
            .await?;
        ensure_success(response, "initialize_speaker").await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response, call: &str) -> TTSResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(TTSError::ProviderError(format!(
        "VOICEVOX {call} failed with {status}: {body}"
    )))
}

/// Write prosody overrides into an audio query object.
fn apply_prosody(query: &mut serde_json::Value, prosody: &ProsodyOverrides) {
    query["speedScale"] = json!(prosody.speed_scale);
    query["pitchScale"] = json!(prosody.pitch_scale);
    query["intonationScale"] = json!(prosody.intonation_scale);
    query["volumeScale"] = json!(prosody.volume_scale);
}

#[async_trait]
impl BaseTTS for VoicevoxTTS {
    async fn create_query(&self, text: &str, voice: VoiceId) -> TTSResult<SynthesisQuery> {
        let response = self
            .client
            .post(self.endpoint("audio_query")?)
            .query(&[("text", text.to_string()), ("speaker", voice.to_string())])
            .send()
            .await?;
        let response = ensure_success(response, "audio_query").await?;

        let mut payload: serde_json::Value = response.json().await?;
        if !payload.is_object() {
            return Err(TTSError::InvalidResponse(
                "audio_query did not return a JSON object".to_string(),
            ));
        }
        apply_prosody(&mut payload, &self.config.prosody);

        debug!(speaker = %voice, text_len = text.len(), "VOICEVOX audio query created");

        Ok(SynthesisQuery {
            text: text.to_string(),
            voice,
            payload: Some(payload),
        })
    }

    async fn synthesize(&self, query: &SynthesisQuery) -> TTSResult<Bytes> {
        let prepared;
        let query = match query.payload {
            Some(_) => query,
            None => {
                prepared = self.create_query(&query.text, query.voice).await?;
                &prepared
            }
        };

        let response = self
            .client
            .post(self.endpoint("synthesis")?)
            .query(&[("speaker", query.voice.to_string())])
            .header("Accept", "audio/wav")
            .json(&query.payload)
            .send()
            .await?;
        let response = ensure_success(response, "synthesis").await?;
        let audio = response.bytes().await?;

        debug!(speaker = %query.voice, audio_bytes = audio.len(), "VOICEVOX synthesis complete");

        Ok(audio)
    }

    fn get_provider_info(&self) -> serde_json::Value {
        json!({
            "provider": "voicevox",
            "api_type": "HTTP REST",
            "endpoint": self.base_url.as_str(),
            "output_format": "wav",
            "request_timeout_secs": self.config.request_timeout_secs,
            "prosody": {
                "speed_scale": self.config.prosody.speed_scale,
                "pitch_scale": self.config.prosody.pitch_scale,
                "intonation_scale": self.config.prosody.intonation_scale,
                "volume_scale": self.config.prosody.volume_scale,
            },
        })
    }
}
