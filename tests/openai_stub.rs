//! Drives the OpenAI-compatible clients against an in-process stub server.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use pdf_chat::embedding::{Embedder, OpenAiEmbedder};
use pdf_chat::llm::openai::OpenAiConfig;
use pdf_chat::llm::{ChatClient, ChatMessage, ChatModel, Provider, ProviderError};
use serde_json::{json, Value};
use std::net::SocketAddr;

const KEY: &str = "test-key";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", KEY))
        .unwrap_or(false)
}

/// Returns vectors in reverse order, tagged with their input index.
async fn embeddings(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| {
            json!({
                "object": "embedding",
                "index": i,
                "embedding": [i as f32, text.as_str().unwrap_or("").len() as f32],
            })
        })
        .collect();
    Json(json!({ "object": "list", "data": data, "model": body["model"] })).into_response()
}

async fn completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_string();
    Json(json!({
        "model": body["model"],
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": format!("echo: {}", last) },
            "finish_reason": "stop",
        }],
    }))
    .into_response()
}

async fn start_stub() -> SocketAddr {
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/chat/completions", post(completions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config(addr: SocketAddr, api_key: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: api_key.into(),
        base_url: format!("http://{}/v1", addr),
    }
}

#[tokio::test]
async fn embeddings_follow_input_order() {
    let addr = start_stub().await;
    let embedder = OpenAiEmbedder::new(
        reqwest::Client::new(),
        config(addr, KEY),
        "text-embedding-3-small",
    );

    let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
    let vectors = embedder.embed(&texts).await.unwrap();
    assert_eq!(
        vectors,
        vec![vec![0.0, 1.0], vec![1.0, 2.0], vec![2.0, 3.0]]
    );
}

#[tokio::test]
async fn missing_key_fails_on_first_use() {
    let addr = start_stub().await;
    let embedder = OpenAiEmbedder::new(reqwest::Client::new(), config(addr, ""), "m");

    let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
    match err {
        ProviderError::Api { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("invalid api key"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn chat_completion_returns_message_content() {
    let addr = start_stub().await;
    let chat = ChatClient::new(
        reqwest::Client::new(),
        Provider::OpenAi(config(addr, KEY)),
        "gpt-4o-mini",
    )
    .with_temperature(0.0);

    let answer = chat
        .complete(&[
            ChatMessage::system("be brief"),
            ChatMessage::user("hello there"),
        ])
        .await
        .unwrap();
    assert_eq!(answer, "echo: hello there");
}

#[tokio::test]
async fn unreachable_provider_is_an_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let chat = ChatClient::new(
        reqwest::Client::new(),
        Provider::OpenAi(config(addr, KEY)),
        "gpt-4o-mini",
    );
    let err = chat.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, ProviderError::Http(_)));
}
