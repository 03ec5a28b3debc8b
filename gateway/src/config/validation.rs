//! Validation of the merged configuration.

use std::error::Error;

use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::Zeroizing;

use super::{ServerConfig, TlsConfig};

static FILE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("file prefix pattern is valid"));

pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn Error>> {
    validate_promotion_threshold(config.promotion_threshold)?;
    validate_public_base_url(&config.public_base_url)?;
    config
        .tts
        .validate()
        .map_err(|e| format!("Invalid TTS configuration: {e}"))?;
    validate_tls(&config.tls)?;
    validate_file_prefix(&config.audio.file_prefix)?;
    validate_rate_limit(
        config.rate_limit_requests_per_second,
        config.rate_limit_burst_size,
    )?;
    validate_database(&config.database_url)?;
    Ok(())
}

pub(super) fn validate_promotion_threshold(threshold: u32) -> Result<(), Box<dyn Error>> {
    if threshold == 0 {
        return Err("PROMOTION_THRESHOLD must be at least 1".into());
    }
    Ok(())
}

pub(super) fn validate_public_base_url(value: &str) -> Result<(), Box<dyn Error>> {
    let url = url::Url::parse(value)
        .map_err(|e| format!("PUBLIC_BASE_URL must be an absolute URL, got '{value}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("PUBLIC_BASE_URL must use http or https, got '{value}'").into());
    }
    Ok(())
}

pub(super) fn validate_tls(tls: &Option<TlsConfig>) -> Result<(), Box<dyn Error>> {
    if let Some(tls) = tls {
        if !tls.cert_path.is_file() {
            return Err(format!(
                "TLS certificate file not found: {}",
                tls.cert_path.display()
            )
            .into());
        }
        if !tls.key_path.is_file() {
            return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
        }
    }
    Ok(())
}

pub(super) fn validate_rate_limit(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), Box<dyn Error>> {
    if requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be at least 1".into());
    }
    if burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be at least 1".into());
    }
    Ok(())
}

pub(super) fn validate_file_prefix(prefix: &str) -> Result<(), Box<dyn Error>> {
    if !FILE_PREFIX.is_match(prefix) {
        return Err(format!(
            "AUDIO_FILE_PREFIX may only contain letters, digits and '-', got '{prefix}'"
        )
        .into());
    }
    Ok(())
}

#[cfg(feature = "postgres")]
pub(super) fn validate_database(url: &Option<Zeroizing<String>>) -> Result<(), Box<dyn Error>> {
    if let Some(url) = url {
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err("DATABASE_URL must be a postgres:// connection string".into());
        }
    }
    Ok(())
}

#[cfg(not(feature = "postgres"))]
pub(super) fn validate_database(url: &Option<Zeroizing<String>>) -> Result<(), Box<dyn Error>> {
    if url.is_some() {
        return Err(
            "DATABASE_URL is set but this build has no database support; rebuild with the `postgres` feature"
                .into(),
        );
    }
    Ok(())
}
