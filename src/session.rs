use crate::embedding::Embedder;
use crate::llm::{ChatMessage, ChatModel, ProviderError};
use crate::vector_index::{IndexError, ScoredChunk, VectorIndex};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 4;

const ANSWER_PROMPT: &str = "Answer the user's question using only the document \
excerpts below. If the excerpts do not contain the answer, say that you don't know \
instead of guessing.";

const CONDENSE_PROMPT: &str = "Given the conversation so far and a follow-up \
question, rewrite the follow-up as a standalone question that can be understood \
without the conversation. Reply with the question only.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
}

/// Append-only list of turns. Flattened, it alternates user/assistant
/// starting with user.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|t| {
                [
                    ChatMessage::user(t.question.clone()),
                    ChatMessage::assistant(t.answer.clone()),
                ]
            })
            .collect()
    }

    fn push(&mut self, question: String, answer: String) {
        self.turns.push(ConversationTurn { question, answer });
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub top_k: usize,
    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            condense_question: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no documents have been processed yet; upload documents and click Process first")]
    NotReady,
    #[error("question is empty")]
    EmptyQuestion,
    #[error("retrieval failed: {0}")]
    Index(#[from] IndexError),
    #[error("chat provider failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Answers questions from the chunks closest to the question and keeps every
/// (question, answer) turn.
pub struct ConversationalSession {
    id: Uuid,
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    options: SessionOptions,
    history: ConversationHistory,
}

impl std::fmt::Debug for ConversationalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationalSession")
            .field("id", &self.id)
            .field("chunks", &self.index.len())
            .field("turns", &self.history.len())
            .finish()
    }
}

impl ConversationalSession {
    pub fn new(
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        chat: Arc<dyn ChatModel>,
        options: SessionOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            embedder,
            chat,
            options,
            history: ConversationHistory::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Answer `question` from the indexed documents and the prior turns.
    ///
    /// History is only extended once the chat provider has answered; any
    /// failure leaves it exactly as it was.
    pub async fn ask(&mut self, question: &str) -> Result<String, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }

        let search_query = self.standalone_question(question).await?;
        let hits = self.retrieve(&search_query).await?;
        let messages = self.answer_messages(question, &hits);

        let answer = self.chat.complete(&messages).await?;
        self.history.push(question.to_string(), answer.clone());
        tracing::info!(
            session = %self.id,
            retrieved = hits.len(),
            turns = self.history.len(),
            "answered question"
        );
        Ok(answer)
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>, SessionError> {
        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.pop().ok_or(IndexError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
        Ok(self.index.search(&query_vector, self.options.top_k)?)
    }

    async fn standalone_question(&self, question: &str) -> Result<String, SessionError> {
        if !self.options.condense_question || self.history.is_empty() {
            return Ok(question.to_string());
        }

        let transcript: String = self
            .history
            .turns()
            .iter()
            .map(|t| format!("Human: {}\nAssistant: {}\n", t.question, t.answer))
            .collect();
        let messages = vec![
            ChatMessage::system(CONDENSE_PROMPT),
            ChatMessage::user(format!(
                "Conversation:\n{}\nFollow-up question: {}",
                transcript, question
            )),
        ];

        let rewritten = self.chat.complete(&messages).await?;
        let rewritten = rewritten.trim();
        tracing::debug!(session = %self.id, standalone = rewritten, "condensed follow-up question");
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }

    fn answer_messages(&self, question: &str, hits: &[ScoredChunk]) -> Vec<ChatMessage> {
        let context = hits
            .iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut messages = Vec::with_capacity(self.history.len() * 2 + 2);
        messages.push(ChatMessage::system(format!(
            "{}\n----------------\n{}",
            ANSWER_PROMPT, context
        )));
        messages.extend(self.history.messages());
        messages.push(ChatMessage::user(question));
        messages
    }
}

/// Per-process holder for the active session.
///
/// Empty until the first successful Process action; each later Process
/// replaces the session wholesale, dropping its history.
#[derive(Debug, Default)]
pub struct SessionContext {
    session: Option<ConversationalSession>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&ConversationalSession> {
        self.session.as_ref()
    }

    /// Install `session`, returning the one it replaces.
    pub fn replace(&mut self, session: ConversationalSession) -> Option<ConversationalSession> {
        let previous = self.session.replace(session);
        if let Some(old) = &previous {
            tracing::info!(session = %old.id(), turns = old.history().len(), "replaced session");
        }
        previous
    }

    pub fn clear(&mut self) {
        self.session = None;
    }

    pub async fn ask(&mut self, question: &str) -> Result<String, SessionError> {
        match self.session.as_mut() {
            Some(session) => session.ask(question).await,
            None => Err(SessionError::NotReady),
        }
    }

    /// Flattened history of the active session; empty when there is none.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.session
            .as_ref()
            .map(|s| s.history().messages())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splitter::TextChunk;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Two-dimensional embedding: (mentions cats, mentions dogs).
    struct PetEmbedder;

    #[async_trait]
    impl Embedder for PetEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.contains("cat") as u8 as f32 + 0.01,
                        t.contains("dog") as u8 as f32 + 0.01,
                    ]
                })
                .collect())
        }
    }

    /// Replays scripted replies and records every prompt it receives.
    #[derive(Default)]
    struct ScriptedChat {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            let mut replies = replies;
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                prompts: Mutex::default(),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("default answer".into()))
        }
    }

    fn session(chat: Arc<ScriptedChat>, options: SessionOptions) -> ConversationalSession {
        let chunks = vec![
            TextChunk {
                index: 0,
                text: "Cats sleep sixteen hours a day.".into(),
            },
            TextChunk {
                index: 1,
                text: "Dogs were domesticated from wolves.".into(),
            },
        ];
        let index = VectorIndex::from_embeddings(
            chunks,
            vec![vec![1.01, 0.01], vec![0.01, 1.01]],
        )
        .unwrap();
        ConversationalSession::new(index, Arc::new(PetEmbedder), chat, options)
    }

    #[tokio::test]
    async fn test_ask_retrieves_context_and_records_turn() {
        let chat = ScriptedChat::new(vec![Ok("Sixteen hours.".into())]);
        let mut s = session(
            chat.clone(),
            SessionOptions {
                top_k: 1,
                condense_question: true,
            },
        );

        let answer = s.ask("How long do cats sleep?").await.unwrap();
        assert_eq!(answer, "Sixteen hours.");

        let prompts = chat.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1, "no condense step on the first question");
        let system = &prompts[0][0];
        assert_eq!(system.role, "system");
        assert!(system.content.contains("Cats sleep"));
        assert!(!system.content.contains("Dogs were"));
        assert_eq!(prompts[0].last().unwrap(), &ChatMessage::user("How long do cats sleep?"));

        assert_eq!(
            s.history().turns(),
            &[ConversationTurn {
                question: "How long do cats sleep?".into(),
                answer: "Sixteen hours.".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_follow_up_is_condensed_and_history_sent() {
        let chat = ScriptedChat::new(vec![
            Ok("Sixteen hours.".into()),
            Ok("Where did dogs come from?".into()),
            Ok("From wolves.".into()),
        ]);
        let mut s = session(chat.clone(), SessionOptions::default());

        s.ask("How long do cats sleep?").await.unwrap();
        s.ask("And what about the other pet's origin?").await.unwrap();

        let prompts = chat.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1][1].content.contains("Human: How long do cats sleep?"));

        let answer_prompt = &prompts[2];
        assert_eq!(answer_prompt[1], ChatMessage::user("How long do cats sleep?"));
        assert_eq!(answer_prompt[2], ChatMessage::assistant("Sixteen hours."));
        assert_eq!(
            answer_prompt[3],
            ChatMessage::user("And what about the other pet's origin?")
        );
        // retrieval used the rewritten question
        assert!(answer_prompt[0].content.starts_with(ANSWER_PROMPT));
        let dogs_at = answer_prompt[0].content.find("Dogs were").unwrap();
        let cats_at = answer_prompt[0].content.find("Cats sleep").unwrap();
        assert!(dogs_at < cats_at);
    }

    #[tokio::test]
    async fn test_history_alternates_after_n_asks() {
        let chat = ScriptedChat::new(Vec::new());
        let mut s = session(
            chat,
            SessionOptions {
                top_k: 2,
                condense_question: false,
            },
        );
        for i in 0..3 {
            s.ask(&format!("question {}", i)).await.unwrap();
        }
        let messages = s.history().messages();
        assert_eq!(messages.len(), 6);
        for (i, m) in messages.iter().enumerate() {
            let expected = if i % 2 == 0 { "user" } else { "assistant" };
            assert_eq!(m.role, expected);
        }
        assert_eq!(messages[4].content, "question 2");
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_history_untouched() {
        let chat = ScriptedChat::new(vec![
            Ok("first".into()),
            Err(ProviderError::Api {
                status: 500,
                message: "boom".into(),
            }),
        ]);
        let mut s = session(
            chat,
            SessionOptions {
                top_k: 1,
                condense_question: false,
            },
        );
        s.ask("one").await.unwrap();
        let err = s.ask("two").await.unwrap_err();
        assert!(matches!(err, SessionError::Provider(ProviderError::Api { status: 500, .. })));
        assert_eq!(s.history().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let chat = ScriptedChat::new(Vec::new());
        let mut s = session(chat.clone(), SessionOptions::default());
        assert!(matches!(s.ask("   ").await, Err(SessionError::EmptyQuestion)));
        assert!(chat.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_context_without_session_is_not_ready() {
        let mut ctx = SessionContext::new();
        assert!(!ctx.is_ready());
        assert!(ctx.messages().is_empty());
        assert!(matches!(ctx.ask("anything").await, Err(SessionError::NotReady)));
    }

    #[tokio::test]
    async fn test_replace_drops_previous_history() {
        let mut ctx = SessionContext::new();
        ctx.replace(session(ScriptedChat::new(Vec::new()), SessionOptions::default()));
        ctx.ask("cats?").await.unwrap();
        assert_eq!(ctx.messages().len(), 2);

        let old = ctx
            .replace(session(ScriptedChat::new(Vec::new()), SessionOptions::default()))
            .unwrap();
        assert_eq!(old.history().len(), 1);
        assert!(ctx.messages().is_empty());

        ctx.clear();
        assert!(!ctx.is_ready());
    }
}
