//! Configuration module for the concierge gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use concierge_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use zeroize::Zeroizing;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use env::DATABASE_URL_SECRET_FILE;
pub use yaml::YamlConfig;

use crate::core::composer::MessageTemplates;
use crate::core::identity::VoiceId;
use crate::core::promotion::DEFAULT_PROMOTION_THRESHOLD;
use crate::core::tts::VoicevoxConfig;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// S3 bucket holding synthesized audio
#[derive(Debug, Clone)]
pub struct S3AudioConfig {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...)
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<Zeroizing<String>>,
}

/// Where synthesized audio files are written
#[derive(Debug, Clone)]
pub struct AudioStorageConfig {
    /// Local directory used when no S3 bucket is configured
    pub dir: PathBuf,
    /// Leading part of every generated filename
    pub file_prefix: String,
    pub s3: Option<S3AudioConfig>,
}

impl Default for AudioStorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/audio"),
            file_prefix: crate::core::audio_store::DEFAULT_AUDIO_FILE_PREFIX.to_string(),
            s3: None,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS, public base URL)
/// - Speech engine settings
/// - Visitor promotion settings
/// - Audio storage (local directory or S3)
/// - Identity database
/// - Security settings (CORS, rate limiting)
/// - Reply templates
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Base of the audio URLs returned to clients
    pub public_base_url: String,

    // Speech engine
    /// When false the gateway runs in text-only mode without probing the engine
    pub tts_enabled: bool,
    pub tts: VoicevoxConfig,

    // Visitors
    /// Voice assigned to newly promoted members
    pub default_voice_id: VoiceId,
    /// Contacts needed before a guest becomes a member
    pub promotion_threshold: u32,

    pub audio: AudioStorageConfig,

    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<Zeroizing<String>>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    pub messages: MessageTemplates,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let port = 5000;
        Self {
            host: "0.0.0.0".to_string(),
            port,
            tls: None,
            public_base_url: utils::default_public_base_url(port),
            tts_enabled: true,
            tts: VoicevoxConfig::default(),
            default_voice_id: VoiceId(1),
            promotion_threshold: DEFAULT_PROMOTION_THRESHOLD,
            audio: AudioStorageConfig::default(),
            database_url: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            messages: MessageTemplates::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only
    ///
    /// Expects `.env` to have been loaded already (done in `main`).
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn has_database(&self) -> bool {
        self.database_url.is_some()
    }

    /// Rate limiting is skipped for very high limits (load testing setups).
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit_requests_per_second < 100_000
    }
}
