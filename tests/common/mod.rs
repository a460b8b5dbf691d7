#![allow(dead_code)]

use async_trait::async_trait;
use pdf_chat::commands::Services;
use pdf_chat::embedding::Embedder;
use pdf_chat::llm::{ChatMessage, ChatModel, ProviderError};
use pdf_chat::session::SessionOptions;
use pdf_chat::splitter::CharacterSplitter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Bag-of-letters embedding: component i counts words starting with a
/// letter that falls in bucket i. Deterministic and good enough to rank.
pub struct KeywordEmbedder {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 401,
                message: "invalid api key".into(),
            });
        }
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.01f32; 8];
                for word in t.split_whitespace() {
                    let first = word.as_bytes()[0].to_ascii_lowercase();
                    v[(first % 8) as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Answers "answer N: <question>" where the question is the last user message.
pub struct EchoChat {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl EchoChat {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatModel for EchoChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 429,
                message: "rate limited".into(),
            });
        }
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("answer {}: {}", n, question))
    }
}

pub fn services(embedder: Arc<KeywordEmbedder>, chat: Arc<EchoChat>) -> Services {
    Services {
        embedder,
        chat,
        splitter: CharacterSplitter::default(),
        batch_size: 20,
        session: SessionOptions {
            top_k: 4,
            condense_question: false,
        },
    }
}

/// `n` characters of plain text with no separator in it.
pub fn plain_text(n: usize) -> String {
    (0..n).map(|i| (b'a' + (i % 26) as u8) as char).collect()
}
