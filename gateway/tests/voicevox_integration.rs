//! VOICEVOX engine integration tests against a wiremock engine.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{audio_path, body_bytes, get, post_interact, silent_wav};
use concierge_gateway::{
    BaseTTS, ServerConfig, VoiceId, VoicevoxConfig, VoicevoxTTS, routes, state::AppState,
};

async fn mount_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"0.14.7\""))
        .mount(server)
        .await;
}

async fn mount_audio_query(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accent_phrases": [],
            "speedScale": 1.0,
            "pitchScale": 0.0,
            "intonationScale": 1.0,
            "volumeScale": 1.0,
            "outputSamplingRate": 24000,
            "outputStereo": false,
        })))
        .mount(server)
        .await;
}

async fn mount_initialize_speaker(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/initialize_speaker"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

/// Gateway config pointing at `engine_url` with audio under `audio_dir`.
fn engine_config(engine_url: &str, audio_dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig {
        host: "127.0.0.1".to_string(),
        public_base_url: common::PUBLIC_BASE_URL.to_string(),
        tts_enabled: true,
        tts: VoicevoxConfig {
            engine_url: engine_url.to_string(),
            request_timeout_secs: 1,
            connect_timeout_secs: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    config.audio.dir = audio_dir.path().join("audio");
    config
}

#[tokio::test]
async fn test_full_flow_through_engine() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    mount_initialize_speaker(&server).await;

    Mock::given(method("POST"))
        .and(path("/audio_query"))
        .and(query_param("text", "(AI response) Hello, Alice."))
        .and(query_param("speaker", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accent_phrases": [],
            "speedScale": 1.0,
            "pitchScale": 0.0,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wav = silent_wav(480);
    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .and(query_param("speaker", "1"))
        .and(body_partial_json(json!({ "speedScale": 1.25 })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/wav")
                .set_body_bytes(wav.clone()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = engine_config(&server.uri(), &temp_dir);
    config.tts.prosody.speed_scale = 1.25;

    let state = AppState::from_config(config).await.unwrap();
    assert!(state.tts().is_ready());
    let router = routes::create_app(state);

    let (status, body) = post_interact(&router, Uuid::new_v4(), "Alice", "Hello").await;
    assert_eq!(status, StatusCode::OK);
    let audio_url = body["audio_url"].as_str().unwrap();
    assert!(audio_url.starts_with("https://concierge.test/audio/voice_"));

    // The file is on disk and served back unchanged.
    let filename = audio_url.rsplit('/').next().unwrap();
    assert!(temp_dir.path().join("audio").join(filename).is_file());

    let response = get(&router, audio_path(audio_url)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), wav.as_slice());
}

#[tokio::test]
async fn test_warmup_initializes_default_voice() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    mount_initialize_speaker(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = engine_config(&server.uri(), &temp_dir);
    config.default_voice_id = VoiceId(3);
    let _state = AppState::from_config(config).await.unwrap();

    // Warmup runs in the background.
    let mut warmed = false;
    for _ in 0..50 {
        let requests = server.received_requests().await.unwrap_or_default();
        warmed = requests.iter().any(|r| {
            r.url.path() == "/initialize_speaker"
                && r.url
                    .query_pairs()
                    .any(|(k, v)| k == "speaker" && v == "3")
        });
        if warmed {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(warmed, "initialize_speaker was never called for voice 3");
}

#[tokio::test]
async fn test_engine_error_gives_text_only_reply() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    mount_initialize_speaker(&server).await;
    mount_audio_query(&server).await;

    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .respond_with(ResponseTemplate::new(500).set_body_string("speaker model crashed"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let state = AppState::from_config(engine_config(&server.uri(), &temp_dir))
        .await
        .unwrap();
    let router = routes::create_app(state);

    let (status, body) = post_interact(&router, Uuid::new_v4(), "Bob", "hi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "(AI response) Hello, Bob.");
    assert_eq!(body["audio_url"], "");
}

#[tokio::test]
async fn test_slow_engine_times_out() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    mount_initialize_speaker(&server).await;
    mount_audio_query(&server).await;

    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(silent_wav(240))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let state = AppState::from_config(engine_config(&server.uri(), &temp_dir))
        .await
        .unwrap();
    let router = routes::create_app(state);

    let started = std::time::Instant::now();
    let (status, body) = post_interact(&router, Uuid::new_v4(), "Carol", "hi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audio_url"], "");
    assert!(started.elapsed() < Duration::from_millis(2900));
}

#[tokio::test]
async fn test_non_wav_response_gives_text_only_reply() {
    let server = MockServer::start().await;
    mount_version(&server).await;
    mount_initialize_speaker(&server).await;
    mount_audio_query(&server).await;

    Mock::given(method("POST"))
        .and(path("/synthesis"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let state = AppState::from_config(engine_config(&server.uri(), &temp_dir))
        .await
        .unwrap();
    let router = routes::create_app(state);

    let (_, body) = post_interact(&router, Uuid::new_v4(), "Dave", "hi").await;
    assert_eq!(body["audio_url"], "");
    assert_eq!(
        std::fs::read_dir(temp_dir.path().join("audio"))
            .unwrap()
            .count(),
        0
    );
}

#[tokio::test]
async fn test_unreachable_engine_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::from_config(engine_config("http://127.0.0.1:9", &temp_dir))
        .await
        .unwrap();
    assert!(!state.tts().is_ready());

    let router = routes::create_app(state);
    let (status, body) = post_interact(&router, Uuid::new_v4(), "Erin", "hi").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "(AI response) Hello, Erin.");
    assert_eq!(body["audio_url"], "");
}

#[tokio::test]
async fn test_probe_reports_version() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let tts = VoicevoxTTS::new(VoicevoxConfig {
        engine_url: server.uri(),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(tts.probe().await.unwrap(), "0.14.7");
    assert!(tts.is_ready());
}

#[tokio::test]
async fn test_engine_behind_path_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/engine/audio_query"))
        .and(query_param("speaker", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "speedScale": 1.0 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/engine/synthesis"))
        .and(body_partial_json(json!({ "pitchScale": 0.0, "volumeScale": 1.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(silent_wav(24)))
        .mount(&server)
        .await;

    let tts = VoicevoxTTS::new(VoicevoxConfig {
        engine_url: format!("{}/engine", server.uri()),
        ..Default::default()
    })
    .unwrap();
    let query = tts.create_query("hello", VoiceId(2)).await.unwrap();
    let audio = tts.synthesize(&query).await.unwrap();
    assert_eq!(audio.as_ref(), silent_wav(24).as_slice());
}
