pub mod chat;
pub mod knowledge;

pub use chat::ask_question;
pub use knowledge::process_documents;

use crate::doc_processor::DocumentSummary;
use crate::embedding::Embedder;
use crate::llm::{ChatMessage, ChatModel};
use crate::session::{SessionContext, SessionOptions};
use crate::splitter::CharacterSplitter;
use std::sync::Arc;

/// Providers and pipeline settings shared by every interaction.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
    pub splitter: CharacterSplitter,
    pub batch_size: usize,
    pub session: SessionOptions,
}

/// Render instruction: the full history to draw plus an optional status line.
#[derive(Debug, Clone, Default)]
pub struct Render {
    pub history: Vec<ChatMessage>,
    pub status: Option<String>,
}

impl Render {
    pub fn from_context(ctx: &SessionContext) -> Self {
        Self {
            history: ctx.messages(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Outcome of a successful Process action.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub documents: Vec<DocumentSummary>,
    pub chunks: usize,
}

impl ProcessReport {
    pub fn summary(&self) -> String {
        let pages: usize = self.documents.iter().map(|d| d.pages).sum();
        format!(
            "Processed {} document(s), {} page(s) into {} chunk(s). Ask away!",
            self.documents.len(),
            pages,
            self.chunks
        )
    }
}
