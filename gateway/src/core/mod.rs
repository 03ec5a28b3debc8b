pub mod audio_store;
pub mod command;
pub mod composer;
pub mod identity;
pub mod interaction;
pub mod locks;
pub mod promotion;
pub mod speech;
pub mod tts;

// Re-export commonly used types for convenience
pub use audio_store::{AudioStore, AudioStoreError, AudioStoreResult, is_valid_audio_filename};
pub use command::{Command, CommandError};
pub use composer::{MessageTemplates, Reply, ResponseComposer};
pub use identity::{
    ContactOutcome, IdentityStore, InMemoryIdentityStore, Member, PendingVisitor, StoreError,
    StoreResult, VisitorId, VoiceId,
};
pub use interaction::{InteractionHandler, InteractionOutcome};
pub use locks::KeyedLocks;
pub use promotion::{DEFAULT_PROMOTION_THRESHOLD, PromotionPolicy, VisitorState};
pub use speech::{SpeechSynthesizer, SynthesisError};
pub use tts::{
    BaseTTS, BoxedTTS, DisabledTTS, SynthesisQuery, TTSError, TTSResult, VoicevoxConfig,
    VoicevoxTTS, connect_tts_provider,
};

#[cfg(feature = "postgres")]
pub use identity::PostgresIdentityStore;
