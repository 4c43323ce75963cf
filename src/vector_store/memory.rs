//! In-memory similarity index.
//!
//! Flat exhaustive search; report collections are small enough that a brute-force
//! scan is cheaper than maintaining an ANN structure.

use super::{cosine_similarity, SearchResult, StoredPassage};
use crate::error::{CaseLinkError, Result};

/// In-memory set of passages with a fixed vector dimensionality.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dimensions: usize,
    passages: Vec<StoredPassage>,
}

impl SimilarityIndex {
    /// Create an index seeded with a single passage.
    pub fn seeded(passage: StoredPassage) -> Result<Self> {
        Self::from_passages(vec![passage])
    }

    /// Build an index from existing passages.
    ///
    /// Fails if the passages are empty or disagree on vector length.
    pub fn from_passages(passages: Vec<StoredPassage>) -> Result<Self> {
        let dimensions = passages
            .first()
            .map(|p| p.vector.len())
            .ok_or_else(|| CaseLinkError::Index("An index needs at least one passage".to_string()))?;

        if dimensions == 0 {
            return Err(CaseLinkError::Index("Passage vectors must not be empty".to_string()));
        }

        if let Some(bad) = passages.iter().find(|p| p.vector.len() != dimensions) {
            return Err(CaseLinkError::Index(format!(
                "Passage {} has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                dimensions
            )));
        }

        Ok(Self {
            dimensions,
            passages,
        })
    }

    /// Append a passage.
    pub fn add(&mut self, passage: StoredPassage) -> Result<()> {
        if passage.vector.len() != self.dimensions {
            return Err(CaseLinkError::Index(format!(
                "Vector has {} dimensions, index expects {}",
                passage.vector.len(),
                self.dimensions
            )));
        }
        self.passages.push(passage);
        Ok(())
    }

    /// Return the `limit` passages closest to `query`, best first.
    ///
    /// Ties keep insertion order. A query of the wrong length is an error rather than
    /// a list of zero scores.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(CaseLinkError::Index(format!(
                "Query has {} dimensions, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut results: Vec<SearchResult> = self
            .passages
            .iter()
            .map(|passage| SearchResult {
                passage: passage.clone(),
                score: cosine_similarity(query, &passage.vector),
            })
            .collect();

        // sort_by is stable
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Vector dimensionality shared by every passage.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// All passages in insertion order.
    pub fn passages(&self) -> &[StoredPassage] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}
