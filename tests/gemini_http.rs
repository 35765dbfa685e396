//! `GeminiClient` against a local mock of the generateContent endpoint.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mailpilot::Error;
use mailpilot::ai::{GeminiClient, TextModel};
use mailpilot::analyzer::{Analyzer, AnalyzerOptions};
use mailpilot::config::AiConfig;
use mailpilot::labels::Label;

const ENDPOINT: &str = "/models/gemini-test:generateContent";

fn mock_config(server_url: &str) -> AiConfig {
    AiConfig {
        api_key: "test-key".into(),
        model: "gemini-test".into(),
        base_url: server_url.into(),
        timeout_secs: 5,
        ..AiConfig::default()
    }
}

fn candidate(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts.iter().map(|t| json!({ "text": t })).collect();
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn sends_json_mode_request_and_joins_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&["{\"summary\":", "\"hola\"}"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(&mock_config(&server.uri())).unwrap();
    let text = client.generate_json("prompt").await.unwrap();

    assert_eq!(text, "{\"summary\":\"hola\"}");
}

#[tokio::test]
async fn server_error_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend exploded"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&mock_config(&server.uri())).unwrap();
    let err = client.generate_json("prompt").await.unwrap_err();

    match err {
        Error::Status { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "backend exploded");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_candidates_are_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&mock_config(&server.uri())).unwrap();
    let err = client.generate_json("prompt").await.unwrap_err();

    assert!(matches!(err, Error::EmptyModelResponse));
}

#[tokio::test]
async fn analyzer_soft_fails_on_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&mock_config(&server.uri())).unwrap();
    let analyzer = Analyzer::new(client, AnalyzerOptions::default());
    let now = NaiveDate::from_ymd_opt(2025, 6, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    let result = analyzer.analyze("Hola", now).await;

    assert_eq!(result.summary, "Error analizando correo");
    assert!(result.error.unwrap().contains("503"));
}

#[tokio::test]
async fn analyzer_reads_model_answer_over_http() {
    let server = MockServer::start().await;

    let answer = r#"{"summary":"Newsletter semanal","meeting_detected":false,"proposed_datetime":null,"duration_minutes":null,"suggested_reply":"Recibido, gracias","suggested_label":"newsletter"}"#;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate(&[answer])))
        .mount(&server)
        .await;

    let client = GeminiClient::new(&mock_config(&server.uri())).unwrap();
    let analyzer = Analyzer::new(client, AnalyzerOptions::default());
    let now = NaiveDate::from_ymd_opt(2025, 6, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    let result = analyzer.analyze("Las novedades de esta semana", now).await;

    assert_eq!(result.summary, "Newsletter semanal");
    assert_eq!(result.suggested_reply, "Recibido, gracias");
    assert_eq!(result.suggested_label, Some(Label::Newsletter));
}
