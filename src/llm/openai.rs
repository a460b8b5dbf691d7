use super::{ChatRequest, ChatResponse, ProviderError};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAiConfig {
    /// Attach the bearer token when one is configured. Local servers such as
    /// Ollama run without a key.
    pub(crate) fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Base URL of the OpenAI-compatible API an Ollama host serves. The host may
/// be given with or without its `/v1` suffix.
pub fn ollama_base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    let host = host.strip_suffix("/v1").unwrap_or(host);
    format!("{}/v1", host.trim_end_matches('/'))
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Read a non-2xx response into a provider error, keeping the body for the log.
pub(crate) async fn api_error(resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    ProviderError::Api {
        status,
        message: text,
    }
}

pub async fn chat(
    client: &Client,
    config: &OpenAiConfig,
    request: &ChatRequest,
) -> Result<ChatResponse, ProviderError> {
    let messages: Vec<OpenAiMessage> = request
        .messages
        .iter()
        .map(|m| OpenAiMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect();

    let body = OpenAiRequest {
        model: request.model.clone(),
        messages,
        stream: false,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let req = client
        .post(config.endpoint("chat/completions"))
        .header("Content-Type", "application/json")
        .json(&body);

    let resp = config.authorize(req).send().await?;

    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    let data: OpenAiResponse = resp.json().await?;
    let content = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::Parse("completion contained no message".into()))?;

    Ok(ChatResponse {
        content,
        model: data.model.unwrap_or_else(|| request.model.clone()),
    })
}
