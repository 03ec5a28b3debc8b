//! VOICEVOX text-to-speech engine.
//!
//! VOICEVOX runs as a separate local HTTP service. Synthesis is two-phase:
//! an audio query is built from the text, tuned with the configured prosody
//! scales, then rendered to a WAV file.

mod config;
mod provider;

pub use config::{ProsodyOverrides, VOICEVOX_DEFAULT_URL, VoicevoxConfig};
pub use provider::VoicevoxTTS;
