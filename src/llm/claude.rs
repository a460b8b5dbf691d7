use super::{ChatRequest, ChatResponse, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: Option<String>,
}

/// The Messages API takes the system prompt out of band, so every system
/// message is folded into one top-level `system` string.
fn build_request(request: &ChatRequest) -> ClaudeRequest {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == "system")
        .map(|m| m.content.as_str())
        .collect();

    let messages: Vec<ClaudeMessage> = request
        .messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| ClaudeMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect();

    ClaudeRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        messages,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        temperature: request.temperature,
    }
}

pub async fn chat(
    client: &Client,
    config: &ClaudeConfig,
    request: &ChatRequest,
) -> Result<ChatResponse, ProviderError> {
    let body = build_request(request);

    let resp = client
        .post(format!("{}/v1/messages", config.base_url.trim_end_matches('/')))
        .header("Content-Type", "application/json")
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", API_VERSION)
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(super::openai::api_error(resp).await);
    }

    let data: ClaudeResponse = resp.json().await?;
    let content: String = data.content.into_iter().filter_map(|c| c.text).collect();
    if content.is_empty() {
        return Err(ProviderError::Parse("message contained no text blocks".into()));
    }

    Ok(ChatResponse {
        content,
        model: request.model.clone(),
    })
}
