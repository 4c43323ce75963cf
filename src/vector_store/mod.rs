//! Similarity index for generated report passages.
//!
//! The index lives in memory for the duration of a session and is persisted as a
//! single SQLite file. [`IndexManager`] owns both sides and keeps them in step at
//! explicit load/save points.

mod manager;
mod memory;
mod sqlite;

pub use manager::IndexManager;
pub use memory::SimilarityIndex;
pub use sqlite::{load_index, save_index, IndexMetadata};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of generated report text plus its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    /// Unique passage ID.
    pub id: Uuid,
    /// Report text.
    pub text: String,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// When this passage was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl StoredPassage {
    /// Create a new passage.
    pub fn new(text: String, vector: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            vector,
            indexed_at: Utc::now(),
        }
    }

    /// Short single-line preview of the passage text.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= max_chars {
            flat
        } else {
            let cut: String = flat.chars().take(max_chars).collect();
            format!("{}...", cut)
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched passage.
    pub passage: StoredPassage,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
