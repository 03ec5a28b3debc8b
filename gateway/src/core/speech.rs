//! Best-effort speech rendering for replies.
//!
//! A reply is turned into audio by the configured engine, sniffed for a WAV
//! header, written to the audio store and exposed through a public URL. Every
//! failure along the way is logged and degrades to "no audio".

use std::io::Cursor;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use super::audio_store::{AudioStore, AudioStoreError};
use super::identity::VoiceId;
use super::tts::{BoxedTTS, TTSError};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Speech engine failed: {0}")]
    Engine(#[from] TTSError),

    #[error("Engine returned invalid audio: {0}")]
    InvalidAudio(String),

    #[error("Failed to store audio: {0}")]
    Storage(#[from] AudioStoreError),
}

pub struct SpeechSynthesizer {
    engine: BoxedTTS,
    audio: AudioStore,
    public_base_url: String,
}

impl SpeechSynthesizer {
    pub fn new(engine: BoxedTTS, audio: AudioStore, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            engine,
            audio,
            public_base_url,
        }
    }

    pub fn engine(&self) -> &BoxedTTS {
        &self.engine
    }

    pub fn audio_store(&self) -> &AudioStore {
        &self.audio
    }

    /// Public URL under which `filename` is served.
    pub fn audio_url(&self, filename: &str) -> String {
        format!("{}/audio/{filename}", self.public_base_url)
    }

    /// Render `text` with `voice` and return the public URL of the stored file.
    pub async fn synthesize(&self, text: &str, voice: VoiceId) -> Result<String, SynthesisError> {
        let query = self.engine.create_query(text, voice).await?;
        let audio = self.engine.synthesize(&query).await?;
        check_wav(&audio)?;
        let filename = self.audio.put(audio).await?;
        Ok(self.audio_url(&filename))
    }

    /// Like [`SpeechSynthesizer::synthesize`] but never fails: any error is
    /// logged and reported as `None`. Empty text is not sent to the engine.
    pub async fn render(&self, text: &str, voice: VoiceId) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }

        match self.synthesize(text, voice).await {
            Ok(url) => {
                debug!(voice = %voice, url = %url, "Reply synthesized");
                Some(url)
            }
            Err(SynthesisError::Engine(TTSError::ProviderNotReady(reason))) => {
                debug!(reason = %reason, "Speech engine unavailable, replying with text only");
                None
            }
            Err(e) => {
                warn!(voice = %voice, error = %e, "Speech synthesis failed, replying with text only");
                None
            }
        }
    }
}

fn check_wav(audio: &Bytes) -> Result<(), SynthesisError> {
    let reader = hound::WavReader::new(Cursor::new(audio.as_ref()))
        .map_err(|e| SynthesisError::InvalidAudio(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate > 0 {
        let seconds = reader.duration() as f64 / f64::from(spec.sample_rate);
        debug!(
            sample_rate = spec.sample_rate,
            channels = spec.channels,
            duration_secs = seconds,
            "Synthesized WAV"
        );
    }
    Ok(())
}
