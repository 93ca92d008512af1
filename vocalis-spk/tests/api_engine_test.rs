//! Tests for the HTTP speech engine against mock providers

use base64::{engine::general_purpose, Engine as _};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;
use vocalis_spk::config::{RequestShape, ResponseShape, SpeechProviderConfig};
use vocalis_spk::engines::api::ApiSpeechEngine;
use vocalis_spk::engines::SpeechEngine;
use vocalis_spk::error::SpeechError;

fn engine(config: &SpeechProviderConfig) -> ApiSpeechEngine {
    ApiSpeechEngine::from_config(config, Duration::from_secs(5)).unwrap()
}

fn cogtts_at(url: String) -> SpeechProviderConfig {
    SpeechProviderConfig {
        endpoint: Some(url),
        api_key: Some("zhipu-key".to_string()),
        ..SpeechProviderConfig::zhipu_cogtts()
    }
}

#[test]
fn test_engine_unavailable_without_required_key() {
    let mut config = SpeechProviderConfig::openai();
    config.resolve_env(|_| None);
    let engine = engine(&config);
    assert!(!engine.is_available());
    assert_eq!(engine.name(), "openai");
}

#[test]
fn test_custom_engine_available_without_key() {
    let config = SpeechProviderConfig {
        endpoint: Some("http://localhost:9000/tts".to_string()),
        ..SpeechProviderConfig::custom_endpoint()
    };
    assert!(engine(&config).is_available());
}

#[test]
fn test_custom_engine_unavailable_without_endpoint() {
    let config = SpeechProviderConfig::custom_endpoint();
    assert!(!engine(&config).is_available());
}

#[tokio::test]
async fn test_binary_response_uses_declared_mime() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/audio/speech")
        .match_header("authorization", "Bearer zhipu-key")
        .match_body(Matcher::Json(json!({
            "model": "cogtts",
            "input": "你好",
            "voice": "tongtong",
            "response_format": "wav"
        })))
        .with_status(200)
        .with_header("content-type", "audio/wav")
        .with_body(vec![82u8, 73, 70, 70, 1, 2, 3])
        .expect(1)
        .create_async()
        .await;

    let engine = engine(&cogtts_at(format!("{}/audio/speech", server.url())));
    let result = engine.synthesize("你好").await.unwrap();

    assert_eq!(result.audio.as_ref(), &[82u8, 73, 70, 70, 1, 2, 3]);
    assert_eq!(result.mime.as_deref(), Some("audio/wav"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openai_shape_omits_format_and_mime() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/audio/speech")
        .match_body(Matcher::Json(json!({
            "model": "gpt-4o-mini-tts",
            "input": "hello",
            "voice": "alloy"
        })))
        .with_status(200)
        .with_body("mp3-bytes")
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/v1/audio/speech", server.url())),
        api_key: Some("sk-openai".to_string()),
        ..SpeechProviderConfig::openai()
    };
    let result = engine(&config).synthesize("hello").await.unwrap();

    assert_eq!(result.audio.as_ref(), b"mp3-bytes");
    assert!(result.mime.is_none());
}

#[tokio::test]
async fn test_json_envelope_is_decoded() {
    let mut server = mockito::Server::new_async().await;
    let encoded = general_purpose::STANDARD.encode(b"ogg-audio");
    let mock = server
        .mock("POST", "/tts")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "text": "hello" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "audio": encoded, "mime": "audio/ogg" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await.unwrap();

    assert_eq!(result.audio.as_ref(), b"ogg-audio");
    assert_eq!(result.mime.as_deref(), Some("audio/ogg"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_json_envelope_sends_optional_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/tts")
        .match_header("authorization", "Bearer tts-key")
        .with_status(200)
        .with_body(json!({ "audio": general_purpose::STANDARD.encode(b"x") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        api_key: Some("tts-key".to_string()),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await.unwrap();

    assert!(result.mime.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_json_envelope_without_audio_is_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tts")
        .with_status(200)
        .with_body(r#"{"mime":"audio/mp3"}"#)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await;

    assert!(matches!(result, Err(SpeechError::Decode(_))));
}

#[tokio::test]
async fn test_json_envelope_with_bad_base64_is_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tts")
        .with_status(200)
        .with_body(r#"{"audio":"***not base64***"}"#)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await;

    assert!(matches!(result, Err(SpeechError::Decode(_))));
}

#[tokio::test]
async fn test_json_envelope_accepts_unpadded_base64() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tts")
        .with_status(200)
        .with_body(r#"{"audio":"UklGRg"}"#)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await.unwrap();

    assert_eq!(result.audio.as_ref(), b"RIFF");
}

#[tokio::test]
async fn test_json_envelope_accepts_line_wrapped_base64() {
    let audio = b"RIFF\x24\x00\x00\x00WAVEfmt ";
    let encoded = general_purpose::STANDARD.encode(audio);
    let wrapped = format!("{}\n{}\r\n", &encoded[..12], &encoded[12..]);

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/tts")
        .with_status(200)
        .with_body(json!({ "audio": wrapped, "mime": "audio/wav" }).to_string())
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/tts", server.url())),
        ..SpeechProviderConfig::custom_endpoint()
    };
    let result = engine(&config).synthesize("hello").await.unwrap();

    assert_eq!(result.audio.as_ref(), audio);
    assert_eq!(result.mime.as_deref(), Some("audio/wav"));
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/audio/speech")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let engine = engine(&cogtts_at(format!("{}/audio/speech", server.url())));
    match engine.synthesize("hello").await {
        Err(SpeechError::Api { provider, status, body }) => {
            assert_eq!(provider, "zhipu-cogtts");
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_binary_body_is_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/audio/speech")
        .with_status(200)
        .create_async()
        .await;

    let engine = engine(&cogtts_at(format!("{}/audio/speech", server.url())));
    assert!(matches!(engine.synthesize("hello").await, Err(SpeechError::Decode(_))));
}

#[tokio::test]
async fn test_missing_key_fails_without_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/audio/speech")
        .expect(0)
        .create_async()
        .await;

    let config = SpeechProviderConfig {
        endpoint: Some(format!("{}/audio/speech", server.url())),
        ..SpeechProviderConfig::zhipu_cogtts()
    };
    let result = engine(&config).synthesize("hello").await;

    assert!(matches!(result, Err(SpeechError::Config(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_text_rejected() {
    let config = SpeechProviderConfig {
        endpoint: Some("http://127.0.0.1:9/tts".to_string()),
        request: RequestShape::PlainText,
        response: ResponseShape::Binary,
        api_key_required: false,
        name: "local".to_string(),
        ..SpeechProviderConfig::default()
    };
    let result = engine(&config).synthesize("   ").await;
    assert!(matches!(result, Err(SpeechError::Engine(_))));
}
