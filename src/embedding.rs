use crate::llm::openai::{api_error, OpenAiConfig};
use crate::llm::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Narrow embedding capability: one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Generate embeddings for a list of texts using the OpenAI-compatible API
pub async fn generate_embeddings(
    client: &Client,
    config: &OpenAiConfig,
    texts: &[String],
    model: &str,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    let body = EmbeddingRequest { model, input: texts };

    let req = client
        .post(config.endpoint("embeddings"))
        .header("Content-Type", "application/json")
        .json(&body);

    let resp = config.authorize(req).send().await?;

    if !resp.status().is_success() {
        return Err(api_error(resp).await);
    }

    let data: EmbeddingResponse = resp.json().await?;
    Ok(order_by_index(data.data))
}

/// The API tags each vector with the position of its input; honour that
/// rather than trusting response order.
fn order_by_index(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}

/// Embedding provider speaking the OpenAI `/embeddings` protocol (OpenAI, Ollama).
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: Client, config: OpenAiConfig, model: impl Into<String>) -> Self {
        Self {
            client,
            config,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");
        generate_embeddings(&self.client, &self.config, texts, &self.model).await
    }
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_response_reordered_by_index() {
        let data = vec![
            EmbeddingData {
                index: Some(1),
                embedding: vec![1.0],
            },
            EmbeddingData {
                index: Some(0),
                embedding: vec![0.0],
            },
        ];
        assert_eq!(order_by_index(data), vec![vec![0.0], vec![1.0]]);
    }
}
