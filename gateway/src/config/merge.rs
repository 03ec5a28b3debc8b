//! Merging of the environment layer with YAML overrides.

use std::error::Error;
use std::path::PathBuf;

use zeroize::Zeroizing;

use super::env;
use super::utils::default_public_base_url;
use super::yaml::YamlConfig;
use super::{S3AudioConfig, ServerConfig, TlsConfig};
use crate::core::identity::VoiceId;

/// Environment variables as the base, YAML values on top.
pub(super) fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn Error>> {
    let mut config = env::load_from_env()?;
    if let Some(yaml) = yaml {
        apply_yaml(&mut config, yaml)?;
    }
    finalize(&mut config);
    Ok(config)
}

/// Fill values that depend on other settings.
pub(super) fn finalize(config: &mut ServerConfig) {
    if config.public_base_url.is_empty() {
        config.public_base_url = default_public_base_url(config.port);
    }
}

pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), Box<dyn Error>> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(url) = server.public_base_url {
            config.public_base_url = url;
        }
        if let Some(tls) = server.tls {
            if tls.enabled == Some(false) {
                config.tls = None;
            } else {
                match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) => {}
                    _ => {
                        return Err(
                            "server.tls.cert_path and server.tls.key_path must be set together"
                                .into(),
                        );
                    }
                }
            }
        }
    }

    if let Some(tts) = yaml.tts {
        if let Some(enabled) = tts.enabled {
            config.tts_enabled = enabled;
        }
        if let Some(url) = tts.engine_url {
            config.tts.engine_url = url;
        }
        if let Some(timeout) = tts.timeout_seconds {
            config.tts.request_timeout_secs = timeout;
        }
        if let Some(timeout) = tts.connect_timeout_seconds {
            config.tts.connect_timeout_secs = timeout;
        }
        if let Some(scale) = tts.speed_scale {
            config.tts.prosody.speed_scale = scale;
        }
        if let Some(scale) = tts.pitch_scale {
            config.tts.prosody.pitch_scale = scale;
        }
        if let Some(scale) = tts.intonation_scale {
            config.tts.prosody.intonation_scale = scale;
        }
        if let Some(scale) = tts.volume_scale {
            config.tts.prosody.volume_scale = scale;
        }
    }

    if let Some(visitors) = yaml.visitors {
        if let Some(voice) = visitors.default_voice_id {
            config.default_voice_id = VoiceId(voice);
        }
        if let Some(threshold) = visitors.promotion_threshold {
            config.promotion_threshold = threshold;
        }
    }

    if let Some(audio) = yaml.audio {
        if let Some(dir) = audio.dir {
            config.audio.dir = PathBuf::from(dir);
        }
        if let Some(prefix) = audio.file_prefix {
            config.audio.file_prefix = prefix;
        }
        if let Some(bucket) = audio.s3_bucket {
            let s3 = config.audio.s3.get_or_insert_with(|| S3AudioConfig {
                bucket: String::new(),
                region: None,
                endpoint: None,
                access_key: None,
                secret_key: None,
            });
            s3.bucket = bucket;
        }
        // The remaining S3 settings only matter once a bucket is known.
        if let Some(s3) = config.audio.s3.as_mut() {
            if let Some(region) = audio.s3_region {
                s3.region = Some(region);
            }
            if let Some(endpoint) = audio.s3_endpoint {
                s3.endpoint = Some(endpoint);
            }
            if let Some(key) = audio.s3_access_key {
                s3.access_key = Some(key);
            }
            if let Some(secret) = audio.s3_secret_key {
                s3.secret_key = Some(Zeroizing::new(secret));
            }
        }
    }

    if let Some(url) = yaml.database.and_then(|db| db.url) {
        config.database_url = Some(Zeroizing::new(url));
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    if let Some(messages) = yaml.messages {
        config.messages = messages;
    }

    Ok(())
}
