//! Context retrieval for answering questions.

use super::RetrievalQuery;
use crate::error::{CaseLinkError, Result};
use crate::vector_store::{IndexManager, StoredPassage};
use std::sync::Arc;
use tracing::debug;

/// Default number of passages retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// Retrieves the passages most similar to a question.
pub struct ContextBuilder {
    index: Arc<IndexManager>,
    top_k: usize,
}

impl ContextBuilder {
    /// Create a new context builder.
    pub fn new(index: Arc<IndexManager>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of passages to retrieve.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Whether there is anything to retrieve from.
    pub fn has_index(&self) -> bool {
        self.index.is_loaded()
    }

    /// Embed `question` and fetch its nearest passages.
    ///
    /// Fails with [`CaseLinkError::NoIndex`] before any embedding call when no index exists.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalQuery> {
        if !self.index.is_loaded() {
            return Err(CaseLinkError::NoIndex);
        }

        let query_embedding = self.index.embedder().embed(question).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        debug!("Retrieved {} passages", results.len());

        let (retrieved_passages, scores) = results
            .into_iter()
            .map(|r| (r.passage, r.score))
            .unzip();

        Ok(RetrievalQuery {
            question: question.to_string(),
            retrieved_passages,
            scores,
        })
    }
}

/// Join passage texts into the context block of the prompt.
pub fn format_context_for_prompt(passages: &[StoredPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;

    #[test]
    fn test_format_context_joins_with_blank_line() {
        let passages = vec![
            StoredPassage::new("First report.".to_string(), vec![1.0]),
            StoredPassage::new("Second report.".to_string(), vec![1.0]),
        ];
        assert_eq!(format_context_for_prompt(&passages), "First report.\n\nSecond report.");
        assert_eq!(format_context_for_prompt(&[]), "");
    }

    #[tokio::test]
    async fn test_retrieve_caps_at_top_k() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(KeywordEmbedder::new(32));
        let index = Arc::new(IndexManager::new(dir.path().join("vectorstore.index"), embedder.clone()));
        for i in 0..7 {
            index.upsert(&format!("report number {}", i)).await.unwrap();
        }

        let builder = ContextBuilder::new(index);
        assert_eq!(builder.top_k(), DEFAULT_TOP_K);

        let query = builder.retrieve("report number 3").await.unwrap();
        assert_eq!(query.retrieved_passages.len(), 5);
        assert_eq!(query.scores.len(), 5);
        assert_eq!(query.retrieved_passages[0].text, "report number 3");
    }

    #[tokio::test]
    async fn test_retrieve_without_index_skips_embedding() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = Arc::new(KeywordEmbedder::new(32));
        let index = Arc::new(IndexManager::new(dir.path().join("vectorstore.index"), embedder.clone()));

        let builder = ContextBuilder::new(index).with_top_k(0);
        assert_eq!(builder.top_k(), 1);
        assert!(matches!(builder.retrieve("anything").await, Err(CaseLinkError::NoIndex)));
        assert_eq!(embedder.calls(), 0);
    }
}
