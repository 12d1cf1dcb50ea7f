use std::time::Duration;

use echosight::error::BackendError;
use echosight::services::{BackendClient, BackendPaths, GuidanceBackend, SpeechAudio};
use httpmock::prelude::*;
use serde_json::json;

fn client(server: &MockServer) -> BackendClient {
    BackendClient::new(server.base_url(), BackendPaths::default(), Duration::from_secs(2))
        .expect("client builds")
}

#[tokio::test]
async fn test_analyze_returns_raw_payload() {
    let server = MockServer::start();
    let analyze = server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(200).json_body(json!({
            "voice_prompt": "Chair ahead",
            "haptic_intensity": 120,
            "detections": [{"label": "Chair", "box": [100, 100, 400, 400]}]
        }));
    });

    let payload = client(&server).analyze().await.expect("analyze succeeds");

    assert_eq!(payload["voice_prompt"], "Chair ahead");
    analyze.assert_calls(1);
}

#[tokio::test]
async fn test_analyze_non_success_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(503).body("camera offline");
    });

    let error = client(&server).analyze().await.unwrap_err();

    match error {
        BackendError::Status { code, body } => {
            assert_eq!(code, 503);
            assert_eq!(body, "camera offline");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_analyze_undecodable_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(200).body("<html>oops</html>");
    });

    assert!(matches!(
        client(&server).analyze().await,
        Err(BackendError::Decode(_))
    ));
}

#[tokio::test]
async fn test_haptic_sends_intensity() {
    let server = MockServer::start();
    let pulse = server.mock(|when, then| {
        when.method(POST)
            .path("/haptic")
            .json_body(json!({"intensity": 255}));
        then.status(200)
            .json_body(json!({"success": true, "message": "pulsed"}));
    });

    let ack = client(&server).haptic(255).await.expect("haptic succeeds");

    assert_eq!(ack.success, Some(true));
    assert_eq!(ack.message.as_deref(), Some("pulsed"));
    pulse.assert_calls(1);
}

#[tokio::test]
async fn test_haptic_empty_body_is_ack() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/haptic");
        then.status(200);
    });

    let ack = client(&server).haptic(10).await.expect("haptic succeeds");
    assert_eq!(ack.success, None);
}

#[tokio::test]
async fn test_speak_returns_audio_bytes() {
    let server = MockServer::start();
    let tts = server.mock(|when, then| {
        when.method(POST)
            .path("/tts")
            .json_body(json!({"text": "Turn left"}));
        then.status(200)
            .header("content-type", "audio/mpeg")
            .body("ID3audio");
    });

    let audio = client(&server).speak("Turn left").await.expect("speak succeeds");

    assert_eq!(audio, SpeechAudio::Audio(b"ID3audio".to_vec()));
    tts.assert_calls(1);
}

#[tokio::test]
async fn test_speak_no_content() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/tts");
        then.status(204);
    });

    assert_eq!(
        client(&server).speak("Turn left").await.expect("speak succeeds"),
        SpeechAudio::NoContent
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Nothing listens on port 9 locally.
    let client = BackendClient::new(
        "http://127.0.0.1:9",
        BackendPaths::default(),
        Duration::from_millis(500),
    )
    .expect("client builds");

    assert!(matches!(
        client.haptic(1).await,
        Err(BackendError::Transport(_))
    ));
}

#[tokio::test]
async fn test_configured_timeout_applies() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/analyze");
        then.status(200)
            .delay(Duration::from_millis(800))
            .json_body(json!({"voice_prompt": "late"}));
    });

    let client = BackendClient::new(
        server.base_url(),
        BackendPaths::default(),
        Duration::from_millis(100),
    )
    .expect("client builds");

    match client.analyze().await {
        Err(BackendError::Transport(error)) => assert!(error.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_client_trims_trailing_slash() {
    let client = BackendClient::new(
        "http://sensor.lan:8000/",
        BackendPaths::default(),
        Duration::from_secs(1),
    )
    .expect("client builds");
    assert_eq!(client.base_url(), "http://sensor.lan:8000");
}
