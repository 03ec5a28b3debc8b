//! Write-once storage for synthesized audio.
//!
//! Files are addressed by a flat, generated name (`{prefix}_{uuid}.wav`) and
//! live in a local directory, an S3 bucket, or memory.

use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{AudioStorageConfig, S3AudioConfig};

pub const AUDIO_EXTENSION: &str = "wav";
pub const DEFAULT_AUDIO_FILE_PREFIX: &str = "voice";

static AUDIO_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+\.wav$").expect("audio filename pattern is valid")
});

/// Whether `name` is a flat audio filename safe to resolve inside the store.
pub fn is_valid_audio_filename(name: &str) -> bool {
    AUDIO_FILENAME.is_match(name)
}

#[derive(Debug, Error)]
pub enum AudioStoreError {
    #[error("Invalid audio filename: {0}")]
    InvalidFilename(String),

    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("Audio storage configuration error: {0}")]
    Configuration(String),

    #[error("Audio storage error: {0}")]
    Storage(#[from] object_store::Error),
}

pub type AudioStoreResult<T> = Result<T, AudioStoreError>;

#[derive(Clone)]
pub struct AudioStore {
    store: Arc<dyn ObjectStore>,
    file_prefix: String,
    backend: &'static str,
}

impl std::fmt::Debug for AudioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStore")
            .field("backend", &self.backend)
            .field("file_prefix", &self.file_prefix)
            .finish()
    }
}

impl AudioStore {
    /// Store files under a local directory, creating it if needed.
    pub fn local(
        dir: impl AsRef<std::path::Path>,
        file_prefix: impl Into<String>,
    ) -> AudioStoreResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            AudioStoreError::Configuration(format!(
                "Failed to create audio directory {}: {e}",
                dir.display()
            ))
        })?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        info!(dir = %dir.display(), "Audio files stored on local filesystem");
        Ok(Self {
            store: Arc::new(store),
            file_prefix: file_prefix.into(),
            backend: "local",
        })
    }

    pub fn s3(settings: &S3AudioConfig, file_prefix: impl Into<String>) -> AudioStoreResult<Self> {
        let mut builder = AmazonS3Builder::new().with_bucket_name(&settings.bucket);
        if let Some(region) = &settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(access_key) = &settings.access_key {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = &settings.secret_key {
            builder = builder.with_secret_access_key(secret_key.as_str());
        }
        let store = builder.build()?;
        info!(bucket = %settings.bucket, "Audio files stored in S3");
        Ok(Self {
            store: Arc::new(store),
            file_prefix: file_prefix.into(),
            backend: "s3",
        })
    }

    pub fn in_memory(file_prefix: impl Into<String>) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            file_prefix: file_prefix.into(),
            backend: "memory",
        }
    }

    /// Pick the backend described by the configuration: S3 when a bucket is set,
    /// the local directory otherwise.
    pub fn from_config(config: &AudioStorageConfig) -> AudioStoreResult<Self> {
        match &config.s3 {
            Some(s3) => Self::s3(s3, config.file_prefix.clone()),
            None => Self::local(&config.dir, config.file_prefix.clone()),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// A fresh filename; never reused.
    pub fn new_filename(&self) -> String {
        format!("{}_{}.{AUDIO_EXTENSION}", self.file_prefix, Uuid::new_v4())
    }

    /// Write `audio` under a fresh filename and return that filename.
    pub async fn put(&self, audio: Bytes) -> AudioStoreResult<String> {
        let filename = self.new_filename();
        let location = object_path(&filename)?;
        let size = audio.len();
        self.store.put(&location, PutPayload::from(audio)).await?;
        debug!(filename = %filename, size, backend = self.backend, "Audio file written");
        Ok(filename)
    }

    pub async fn get(&self, filename: &str) -> AudioStoreResult<Bytes> {
        let location = object_path(filename)?;
        let result = match self.store.get(&location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(AudioStoreError::NotFound(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(result.bytes().await?)
    }
}

fn object_path(filename: &str) -> AudioStoreResult<ObjectPath> {
    if !is_valid_audio_filename(filename) {
        return Err(AudioStoreError::InvalidFilename(filename.to_string()));
    }
    ObjectPath::parse(filename).map_err(|_| AudioStoreError::InvalidFilename(filename.to_string()))
}
