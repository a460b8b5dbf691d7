use crate::{
    commands::Services,
    config::{Config, ProviderKind},
    embedding::OpenAiEmbedder,
    llm::{
        claude::ClaudeConfig,
        openai::{ollama_base_url, OpenAiConfig},
        ChatClient, Provider,
    },
    session::SessionOptions,
    web::{self, AppState},
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "pdf-chat")]
#[command(about = "Chat with your PDFs: upload documents, index them, ask questions")]
pub struct Args {
    /// Path to config TOML. If omitted, uses ./pdf-chat.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Address to serve the page on, e.g. 0.0.0.0:8501.
    #[arg(long, env = "PDF_CHAT_BIND")]
    pub bind: Option<String>,
}

pub async fn run(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    init_logging(&args, &cfg)?;

    let bind = args.bind.as_deref().unwrap_or(cfg.server.bind.as_str());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", bind))?;

    let services = build_services(&cfg)?;
    info!(
        embedding_model = %cfg.embedding.model,
        chat_model = %cfg.chat.model,
        chat_provider = ?cfg.chat.provider,
        top_k = cfg.retrieval.top_k,
        "providers configured"
    );

    web::serve(AppState::new(services), addr, cfg.server.max_upload_bytes).await
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("pdf-chat.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<()> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}

/// Wire the configured providers into the pipeline. API keys are read from
/// the environment here; a missing key only surfaces on the first request.
pub fn build_services(cfg: &Config) -> Result<Services> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.http.request_timeout_secs))
        .build()
        .context("building HTTP client")?;

    let embedding_config = match cfg.embedding.provider {
        ProviderKind::Openai => OpenAiConfig {
            api_key: cfg.embedding.api_key(),
            base_url: cfg.embedding.base_url(),
        },
        ProviderKind::Ollama => OpenAiConfig {
            api_key: cfg.embedding.api_key(),
            base_url: ollama_base_url(&cfg.embedding.base_url()),
        },
        ProviderKind::Claude => {
            return Err(anyhow!("claude does not provide an embeddings API"));
        }
    };
    let embedder = OpenAiEmbedder::new(client.clone(), embedding_config, &cfg.embedding.model);

    let provider = match cfg.chat.provider {
        ProviderKind::Openai => Provider::OpenAi(OpenAiConfig {
            api_key: cfg.chat.api_key(),
            base_url: cfg.chat.base_url(),
        }),
        ProviderKind::Ollama => Provider::ollama(cfg.chat.base_url()),
        ProviderKind::Claude => Provider::Claude(ClaudeConfig {
            api_key: cfg.chat.api_key(),
            base_url: cfg.chat.base_url(),
        }),
    };
    let mut chat = ChatClient::new(client, provider, &cfg.chat.model)
        .with_temperature(cfg.chat.temperature);
    if let Some(max_tokens) = cfg.chat.max_tokens {
        chat = chat.with_max_tokens(max_tokens);
    }

    Ok(Services {
        embedder: Arc::new(embedder),
        chat: Arc::new(chat),
        splitter: cfg.chunking.splitter()?,
        batch_size: cfg.embedding.batch_size,
        session: SessionOptions {
            top_k: cfg.retrieval.top_k,
            condense_question: cfg.retrieval.condense_question,
        },
    })
}
