//! Deterministic test doubles for the external providers.

use crate::embedding::Embedder;
use crate::error::{CaseLinkError, Result};
use crate::rag::{ChatModel, ConversationTurn};
use crate::report::{ReportGenerator, VideoAsset};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Bag-of-words embedder: each distinct lowercase token gets its own dimension.
///
/// Identical texts embed identically and texts sharing words score higher, which is
/// all the retrieval tests need.
pub struct KeywordEmbedder {
    dimensions: usize,
    vocabulary: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vocabulary: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `embed`/`embed_batch` invocations.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimensions];
        let mut vocabulary = self.vocabulary.lock().unwrap();
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
        {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(token).or_insert(next);
            vector[slot % self.dimensions] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        "keyword-test"
    }
}

/// Chat model that replays queued replies and records every request.
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<ConversationTurn>>>,
}

impl ScriptedChatModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A model whose next call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<ConversationTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn complete(&self, messages: &[ConversationTurn]) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(CaseLinkError::OpenAI(message)),
            None => Err(CaseLinkError::OpenAI("no scripted reply left".to_string())),
        }
    }
}

/// Report generator returning a fixed report, or no text at all.
pub struct StubReportGenerator {
    report: Option<String>,
    calls: AtomicUsize,
}

impl StubReportGenerator {
    pub fn returning(report: &str) -> Self {
        Self {
            report: Some(report.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulates a generation response that carries no text payload.
    pub fn without_text() -> Self {
        Self {
            report: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportGenerator for StubReportGenerator {
    async fn generate(&self, _video: &VideoAsset) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.report
            .clone()
            .ok_or_else(|| CaseLinkError::Generation("response carried no text".to_string()))
    }
}
