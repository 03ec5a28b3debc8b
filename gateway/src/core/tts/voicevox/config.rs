//! VOICEVOX engine configuration.

use serde::Deserialize;

/// Local VOICEVOX engine address used when nothing is configured.
pub const VOICEVOX_DEFAULT_URL: &str = "http://127.0.0.1:50021";

fn default_engine_url() -> String {
    VOICEVOX_DEFAULT_URL.to_string()
}

fn default_request_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    2
}

fn default_unit_scale() -> f32 {
    1.0
}

/// Prosody parameters written into every audio query before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProsodyOverrides {
    /// Speaking speed (1.0 is the engine's normal pace)
    #[serde(default = "default_unit_scale")]
    pub speed_scale: f32,
    /// Pitch shift (0.0 leaves the pitch unchanged)
    #[serde(default)]
    pub pitch_scale: f32,
    /// Intonation strength
    #[serde(default = "default_unit_scale")]
    pub intonation_scale: f32,
    /// Output volume
    #[serde(default = "default_unit_scale")]
    pub volume_scale: f32,
}

impl Default for ProsodyOverrides {
    fn default() -> Self {
        Self {
            speed_scale: 1.0,
            pitch_scale: 0.0,
            intonation_scale: 1.0,
            volume_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VoicevoxConfig {
    /// Base address of the engine's HTTP API
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Upper bound for a single engine call in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound for establishing a connection in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub prosody: ProsodyOverrides,
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            prosody: ProsodyOverrides::default(),
        }
    }
}

impl VoicevoxConfig {
    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.engine_url)
            .map_err(|e| format!("Invalid VOICEVOX engine URL '{}': {e}", self.engine_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "VOICEVOX engine URL must use http or https, got: {}",
                url.scheme()
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err("TTS request timeout must be greater than zero".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("TTS connect timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VoicevoxConfig::default();
        assert_eq!(config.engine_url, VOICEVOX_DEFAULT_URL);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.prosody.speed_scale, 1.0);
        assert_eq!(config.prosody.pitch_scale, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = VoicevoxConfig {
            engine_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = VoicevoxConfig {
            engine_url: "ftp://engine:50021".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("http"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = VoicevoxConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
