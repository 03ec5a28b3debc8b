mod base;
pub mod disabled;
pub mod voicevox;

use std::sync::Arc;

pub use base::{BaseTTS, BoxedTTS, SynthesisQuery, TTSError, TTSResult};
pub use disabled::DisabledTTS;
pub use voicevox::{ProsodyOverrides, VOICEVOX_DEFAULT_URL, VoicevoxConfig, VoicevoxTTS};

use tracing::{debug, info, warn};

use crate::core::identity::VoiceId;

/// Select the speech engine for the lifetime of the process.
///
/// When speech is disabled, or the engine cannot be built or does not answer
/// its version probe, a [`DisabledTTS`] is returned and the gateway runs in
/// text-only mode. A reachable engine gets a background warmup of
/// `warmup_voice` so the first visitor does not pay the model load.
pub async fn connect_tts_provider(
    enabled: bool,
    config: &VoicevoxConfig,
    warmup_voice: VoiceId,
) -> BoxedTTS {
    if !enabled {
        info!("Speech synthesis disabled by configuration, running in text-only mode");
        return Arc::new(DisabledTTS::new("speech synthesis disabled by configuration"));
    }

    let tts = match VoicevoxTTS::new(config.clone()) {
        Ok(tts) => tts,
        Err(e) => {
            warn!(error = %e, "Could not build VOICEVOX client, running in text-only mode");
            return Arc::new(DisabledTTS::new(e.to_string()));
        }
    };

    match tts.probe().await {
        Ok(version) => {
            info!(
                engine_url = %config.engine_url,
                version = %version,
                "Connected to VOICEVOX engine"
            );
            let tts = Arc::new(tts);
            let warmup = Arc::clone(&tts);
            tokio::spawn(async move {
                match warmup.initialize_speaker(warmup_voice).await {
                    Ok(()) => debug!(speaker = %warmup_voice, "VOICEVOX speaker initialized"),
                    Err(e) => warn!(speaker = %warmup_voice, error = %e, "VOICEVOX warmup failed"),
                }
            });
            tts
        }
        Err(e) => {
            warn!(
                engine_url = %config.engine_url,
                error = %e,
                "VOICEVOX engine unreachable, running in text-only mode"
            );
            Arc::new(DisabledTTS::new(format!(
                "VOICEVOX engine unreachable at {}: {e}",
                config.engine_url
            )))
        }
    }
}
