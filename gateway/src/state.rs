use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::audio_store::AudioStore;
use crate::core::composer::ResponseComposer;
use crate::core::identity::{IdentityStore, InMemoryIdentityStore};
use crate::core::interaction::InteractionHandler;
use crate::core::promotion::PromotionPolicy;
use crate::core::speech::SpeechSynthesizer;
use crate::core::tts::{BoxedTTS, connect_tts_provider};
use crate::errors::AppError;

/// Shared handles built once at startup and passed to every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub interactions: InteractionHandler,
}

impl AppState {
    /// Build the identity store, speech engine and audio store described by `config`.
    ///
    /// The speech engine is probed here; an unreachable engine is not an error
    /// and leaves the gateway in text-only mode.
    pub async fn from_config(config: ServerConfig) -> Result<Arc<Self>, AppError> {
        let store = connect_identity_store(&config).await?;
        let tts =
            connect_tts_provider(config.tts_enabled, &config.tts, config.default_voice_id).await;
        let audio = AudioStore::from_config(&config.audio)?;

        info!(
            tts_ready = tts.is_ready(),
            audio_backend = audio.backend(),
            promotion_threshold = config.promotion_threshold,
            "Application state initialized"
        );

        Ok(Self::with_components(config, store, tts, audio))
    }

    /// Assemble the state from ready-made components.
    pub fn with_components(
        config: ServerConfig,
        store: Arc<dyn IdentityStore>,
        tts: BoxedTTS,
        audio: AudioStore,
    ) -> Arc<Self> {
        let speech = SpeechSynthesizer::new(tts, audio, config.public_base_url.clone());
        let interactions = InteractionHandler::new(
            store,
            PromotionPolicy::new(config.promotion_threshold),
            ResponseComposer::new(config.messages.clone()),
            speech,
            config.default_voice_id,
        );
        Arc::new(Self {
            config,
            interactions,
        })
    }

    pub fn audio_store(&self) -> &AudioStore {
        self.interactions.speech().audio_store()
    }

    pub fn tts(&self) -> &BoxedTTS {
        self.interactions.speech().engine()
    }
}

#[cfg(feature = "postgres")]
async fn connect_identity_store(config: &ServerConfig) -> Result<Arc<dyn IdentityStore>, AppError> {
    use crate::core::identity::PostgresIdentityStore;

    match &config.database_url {
        Some(url) => {
            let store = PostgresIdentityStore::connect(url.as_str()).await?;
            info!("Identity records stored in Postgres");
            Ok(Arc::new(store))
        }
        None => {
            info!("No DATABASE_URL configured, identity records kept in memory");
            Ok(Arc::new(InMemoryIdentityStore::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn connect_identity_store(config: &ServerConfig) -> Result<Arc<dyn IdentityStore>, AppError> {
    if config.database_url.is_some() {
        return Err(AppError::Configuration(
            "DATABASE_URL is set but this build has no database support".to_string(),
        ));
    }
    info!("Identity records kept in memory");
    Ok(Arc::new(InMemoryIdentityStore::new()))
}
