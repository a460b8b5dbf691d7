use crate::splitter::{
    CharacterSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATOR,
};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub chunking: Chunking,
    #[serde(default)]
    pub embedding: Embedding,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub retrieval: Retrieval,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would only fail later, mid-interaction.
    pub fn validate(&self) -> Result<()> {
        self.chunking.splitter()?;
        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be at least 1");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be at least 1");
        }
        if self.embedding.provider == ProviderKind::Claude {
            bail!("embedding.provider = \"claude\" is not supported; use openai or ollama");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: String,
    pub max_upload_bytes: usize,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".into(),
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chunking {
    pub separator: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}
impl Default for Chunking {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
impl Chunking {
    pub fn splitter(&self) -> Result<CharacterSplitter> {
        CharacterSplitter::new(self.separator.clone(), self.chunk_size, self.chunk_overlap)
            .with_context(|| "invalid [chunking] settings")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Ollama,
    Claude,
}

impl ProviderKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Openai => crate::llm::openai::DEFAULT_BASE_URL,
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::Claude => crate::llm::claude::DEFAULT_BASE_URL,
        }
    }
}

/// Read an API key from the environment. A missing key is not an error here;
/// the provider rejects the first request instead.
fn api_key_from_env(var: &str) -> String {
    if var.is_empty() {
        return String::new();
    }
    std::env::var(var).unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Embedding {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub batch_size: usize,
}
impl Default for Embedding {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            model: "text-embedding-3-small".into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            batch_size: crate::vector_index::DEFAULT_BATCH_SIZE,
        }
    }
}
impl Embedding {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn api_key(&self) -> String {
        api_key_from_env(&self.api_key_env)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}
impl Default for Chat {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            model: "gpt-4o-mini".into(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }
}
impl Chat {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
    }

    pub fn api_key(&self) -> String {
        api_key_from_env(&self.api_key_env)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retrieval {
    pub top_k: usize,
    pub condense_question: bool,
}
impl Default for Retrieval {
    fn default() -> Self {
        Self {
            top_k: crate::session::DEFAULT_TOP_K,
            condense_question: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Http {
    pub request_timeout_secs: u64,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}
