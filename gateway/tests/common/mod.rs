//! Shared helpers for the gateway integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

use concierge_gateway::{
    AudioStore, BaseTTS, BoxedTTS, InMemoryIdentityStore, ServerConfig, SynthesisQuery, TTSError,
    TTSResult, VoiceId, routes, state::AppState,
};

pub const PUBLIC_BASE_URL: &str = "https://concierge.test";

/// Mono 16-bit WAV of `samples` zero samples at 24 kHz.
pub fn silent_wav(samples: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    buffer.into_inner()
}

/// Engine answering every request with a short WAV and recording the voice used.
#[derive(Default)]
pub struct FakeEngine {
    pub voices: Mutex<Vec<VoiceId>>,
}

#[async_trait]
impl BaseTTS for FakeEngine {
    async fn create_query(&self, text: &str, voice: VoiceId) -> TTSResult<SynthesisQuery> {
        Ok(SynthesisQuery {
            text: text.to_string(),
            voice,
            payload: Some(serde_json::json!({ "kana": text })),
        })
    }

    async fn synthesize(&self, query: &SynthesisQuery) -> TTSResult<Bytes> {
        self.voices.lock().push(query.voice);
        Ok(Bytes::from(silent_wav(240)))
    }

    fn get_provider_info(&self) -> Value {
        serde_json::json!({ "provider": "fake" })
    }
}

/// Engine failing every request the way an unreachable host would.
pub struct UnreachableEngine;

#[async_trait]
impl BaseTTS for UnreachableEngine {
    async fn synthesize(&self, _query: &SynthesisQuery) -> TTSResult<Bytes> {
        Err(TTSError::NetworkError("connection refused".to_string()))
    }

    fn get_provider_info(&self) -> Value {
        serde_json::json!({ "provider": "unreachable" })
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        public_base_url: PUBLIC_BASE_URL.to_string(),
        tts_enabled: false,
        ..Default::default()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryIdentityStore>,
}

/// Application wired with an in-memory store, in-memory audio and `engine`.
pub fn test_app(engine: BoxedTTS, threshold: u32) -> TestApp {
    let config = ServerConfig {
        promotion_threshold: threshold,
        ..test_config()
    };
    let store = Arc::new(InMemoryIdentityStore::new());
    let state = AppState::with_components(
        config,
        store.clone(),
        engine,
        AudioStore::in_memory("voice"),
    );
    TestApp {
        router: routes::create_app(state.clone()),
        state,
        store,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn post_interact(
    router: &Router,
    user_id: Uuid,
    user_name: &str,
    message: &str,
) -> (StatusCode, Value) {
    let body = serde_json::json!({
        "UserId": user_id,
        "UserName": user_name,
        "Message": message,
    });
    let request = Request::builder()
        .method("POST")
        .uri("/interact")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.clone().oneshot(request).await.unwrap()
}

/// Path part of an audio URL returned by `/interact`.
pub fn audio_path(audio_url: &str) -> &str {
    audio_url
        .strip_prefix(PUBLIC_BASE_URL)
        .expect("audio URL uses the public base URL")
}
