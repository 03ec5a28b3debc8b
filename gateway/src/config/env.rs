//! Environment variable layer.

use std::error::Error;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::utils::{env_var, parse_env, parse_env_bool, read_secret_file};
use super::{AudioStorageConfig, S3AudioConfig, ServerConfig, TlsConfig};
use crate::core::identity::VoiceId;

/// Secret file consulted when `DATABASE_URL` is not set.
pub const DATABASE_URL_SECRET_FILE: &str = "/etc/secrets/connection_string";

/// Build a configuration from environment variables on top of the defaults.
///
/// `public_base_url` is left empty when neither `PUBLIC_BASE_URL` nor
/// `RENDER_EXTERNAL_URL` is set; it is derived from the final port after merging.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn Error>> {
    load_from_env_with_secret_file(Path::new(DATABASE_URL_SECRET_FILE))
}

pub(super) fn load_from_env_with_secret_file(
    secret_file: &Path,
) -> Result<ServerConfig, Box<dyn Error>> {
    let defaults = ServerConfig::default();

    let host = env_var("HOST").unwrap_or(defaults.host);
    let port = parse_env("PORT")?.unwrap_or(defaults.port);

    let tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    };

    let public_base_url = env_var("PUBLIC_BASE_URL")
        .or_else(|| env_var("RENDER_EXTERNAL_URL"))
        .unwrap_or_default();

    let mut tts = defaults.tts;
    if let Some(url) = env_var("VOICEVOX_URL") {
        tts.engine_url = url;
    }
    if let Some(timeout) = parse_env("TTS_TIMEOUT_SECONDS")? {
        tts.request_timeout_secs = timeout;
    }
    if let Some(scale) = parse_env("TTS_SPEED_SCALE")? {
        tts.prosody.speed_scale = scale;
    }
    if let Some(scale) = parse_env("TTS_PITCH_SCALE")? {
        tts.prosody.pitch_scale = scale;
    }
    if let Some(scale) = parse_env("TTS_INTONATION_SCALE")? {
        tts.prosody.intonation_scale = scale;
    }
    if let Some(scale) = parse_env("TTS_VOLUME_SCALE")? {
        tts.prosody.volume_scale = scale;
    }

    let audio = AudioStorageConfig {
        dir: env_var("AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.audio.dir),
        file_prefix: env_var("AUDIO_FILE_PREFIX").unwrap_or(defaults.audio.file_prefix),
        s3: env_var("AUDIO_S3_BUCKET").map(|bucket| S3AudioConfig {
            bucket,
            region: env_var("AUDIO_S3_REGION"),
            endpoint: env_var("AUDIO_S3_ENDPOINT"),
            access_key: env_var("AUDIO_S3_ACCESS_KEY"),
            secret_key: env_var("AUDIO_S3_SECRET_KEY").map(Zeroizing::new),
        }),
    };

    let database_url = env_var("DATABASE_URL")
        .or_else(|| read_secret_file(secret_file))
        .map(Zeroizing::new);

    Ok(ServerConfig {
        host,
        port,
        tls,
        public_base_url,
        tts_enabled: parse_env_bool("TTS_ENABLED")?.unwrap_or(defaults.tts_enabled),
        tts,
        default_voice_id: parse_env("DEFAULT_VOICE_ID")?
            .map(VoiceId)
            .unwrap_or(defaults.default_voice_id),
        promotion_threshold: parse_env("PROMOTION_THRESHOLD")?
            .unwrap_or(defaults.promotion_threshold),
        audio,
        database_url,
        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")?
            .unwrap_or(defaults.rate_limit_requests_per_second),
        rate_limit_burst_size: parse_env("RATE_LIMIT_BURST_SIZE")?
            .unwrap_or(defaults.rate_limit_burst_size),
        messages: defaults.messages,
    })
}
