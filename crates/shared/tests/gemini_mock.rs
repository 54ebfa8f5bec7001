use std::sync::Arc;
use std::time::Duration;

use shared::{
    GeminiClient, GeminiConfig, GenerationOptions, ImageModel, NewsletterError,
    NewsletterGenerator, Outcome, TextModel,
};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEXT_PATH: &str = "/models/gemini-2.5-flash:generateContent";
const IMAGE_PATH: &str = "/models/imagen-3.0-generate-002:predict";

fn text_response(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [
            {
                "content": {
                    "role": "model",
                    "parts": [{ "text": text }]
                },
                "finishReason": "STOP"
            }
        ]
    })
}

fn image_response(base64: &str) -> serde_json::Value {
    serde_json::json!({
        "predictions": [
            { "bytesBase64Encoded": base64, "mimeType": "image/png" }
        ]
    })
}

fn client(server: &MockServer) -> GeminiClient {
    let mut config = GeminiConfig::new("test-api-key");
    config.base_url = server.uri();
    config.retry_backoff = Duration::from_millis(10);
    GeminiClient::new(config).unwrap()
}

#[tokio::test]
async fn test_text_request_with_search() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(header("x-goog-api-key", "test-api-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "parts": [{ "text": "find news" }] }],
            "tools": [{ "google_search": {} }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("[]")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate_text("find news", true).await.unwrap();
    assert_eq!(text, "[]");
}

#[tokio::test]
async fn test_text_parts_are_concatenated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "<h1>A" }, { "text": "</h1>" }] } }]
        })))
        .mount(&server)
        .await;

    let text = client(&server).generate_text("draft", false).await.unwrap();
    assert_eq!(text, "<h1>A</h1>");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("RESOURCE_EXHAUSTED"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).generate_text("hello", false).await.unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("API key not valid"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).generate_text("hello", false).await.unwrap_err();

    let NewsletterError::Transport(message) = err else {
        panic!("expected a transport error");
    };
    assert!(message.contains("400"));
    assert!(message.contains("API key not valid"));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).generate_text("hello", false).await.unwrap_err();
    assert!(matches!(err, NewsletterError::Transport(_)));
}

#[tokio::test]
async fn test_empty_candidates_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client(&server).generate_text("hello", false).await.unwrap_err();
    assert!(err.to_string().contains("no text"));
}

#[tokio::test]
async fn test_image_request_decodes_bytes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(serde_json::json!({
            "instances": [{ "prompt": "mountains at dawn" }],
            "parameters": { "sampleCount": 1, "aspectRatio": "16:9", "outputMimeType": "image/png" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("iVBORw==")))
        .expect(1)
        .mount(&server)
        .await;

    let image = client(&server).generate_image("mountains at dawn").await.unwrap();

    assert_eq!(image.bytes, vec![0x89, 0x50, 0x4e, 0x47]);
    assert_eq!(image.to_data_uri(), "data:image/png;base64,iVBORw==");
}

#[tokio::test]
async fn test_image_without_predictions_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let err = client(&server).generate_image("anything").await.unwrap_err();
    assert!(err.to_string().contains("no image"));
}

#[tokio::test]
async fn test_generation_cycle_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(body_string_contains("news research assistant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "Here you go:\n```json\n[{\"title\":\"T\",\"summary\":\"S\",\"source\":\"Src\",\"link\":\"http://x\",\"date\":\"2024-01-01\"}]\n```",
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(TEXT_PATH))
        .and(body_string_contains("expert newsletter writer"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_response("```html\n<h1>Title</h1><p>Body</p>\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("iVBORw==")))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(client(&server));
    let generator = NewsletterGenerator::new(client.clone(), client);
    let mut options = GenerationOptions::with_topics(["Quantum Computing"]);
    options.min_articles = 1;

    let outcome = generator.run_generation(options).await;

    let Outcome::Completed(document) = outcome else {
        panic!("expected a completed outcome");
    };
    assert_eq!(document.body_html, "<h1>Title</h1><p>Body</p>");
    assert_eq!(
        document.header_image.as_deref(),
        Some("data:image/png;base64,iVBORw==")
    );
    assert_eq!(generator.snapshot().articles[0].source, "Src");
}
