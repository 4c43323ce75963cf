//! Ownership of the single persisted similarity index.

use super::{load_index, save_index, IndexMetadata, SearchResult, SimilarityIndex, StoredPassage};
use crate::embedding::Embedder;
use crate::error::{CaseLinkError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Loads, extends and persists the similarity index shared by report ingestion and
/// question answering.
pub struct IndexManager {
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    index: RwLock<Option<SimilarityIndex>>,
    /// Held for the whole of an upsert so snapshots are written one at a time.
    writer: Mutex<()>,
}

impl IndexManager {
    /// Create a manager with no index loaded.
    ///
    /// Nothing is read until [`load`](Self::load) or the first upsert.
    pub fn new(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            path: path.into(),
            embedder,
            index: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Create a manager and load whatever is persisted.
    ///
    /// An unreadable index is logged and treated as absent; the next upsert replaces it.
    pub fn open(path: impl Into<PathBuf>, embedder: Arc<dyn Embedder>) -> Self {
        let manager = Self::new(path, embedder);
        match manager.load() {
            Ok(_) => {}
            Err(e @ CaseLinkError::Load(_)) => warn!("{}; starting with an empty index", e),
            Err(e) => warn!("{}", e),
        }
        manager
    }

    /// Location of the persisted index.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted index into memory.
    ///
    /// Returns the number of passages loaded, or `None` when nothing is persisted.
    /// On failure the in-memory index is cleared. An unreadable file is a
    /// [`CaseLinkError::Load`]; vectors whose length differs from the configured
    /// embedder are a [`CaseLinkError::Index`] and the file is left alone.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Option<usize>> {
        let loaded = load_index(&self.path);
        let mut slot = self.write_slot()?;

        match loaded {
            Ok(Some((index, metadata))) => {
                if index.dimensions() != self.embedder.dimensions() {
                    *slot = None;
                    return Err(CaseLinkError::Index(format!(
                        "Index at {} holds {}-dimensional vectors ({}) but the configured embedder produces {}; \
                         restore the embedding settings or move the index aside",
                        self.path.display(),
                        index.dimensions(),
                        metadata.embedding_model,
                        self.embedder.dimensions()
                    )));
                }
                if metadata.embedding_model != self.embedder.model() {
                    warn!(
                        "Index was built with '{}' but '{}' is configured; similarity scores may be meaningless",
                        metadata.embedding_model,
                        self.embedder.model()
                    );
                }
                let count = index.len();
                *slot = Some(index);
                Ok(Some(count))
            }
            Ok(None) => {
                *slot = None;
                Ok(None)
            }
            Err(e) => {
                *slot = None;
                Err(e)
            }
        }
    }

    /// Embed `text`, add it to the index and persist the whole index.
    ///
    /// When nothing is loaded yet the persisted index is read first, so an existing
    /// file is extended rather than replaced; only an unreadable file is started over.
    /// The in-memory index changes only after the snapshot is on disk.
    ///
    /// Returns the number of passages in the index afterwards.
    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn upsert(&self, text: &str) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(CaseLinkError::InvalidInput(
                "Cannot index empty report text".to_string(),
            ));
        }

        let vector = self.embedder.embed(text).await?;
        let passage = StoredPassage::new(text.to_string(), vector);
        let metadata = IndexMetadata {
            embedding_model: self.embedder.model().to_string(),
            dimensions: passage.vector.len(),
        };

        let _writer = self.writer.lock().await;
        let current = self.read_slot()?.clone();
        let path = self.path.clone();

        // SQLite and file renames block, so the snapshot is built and written off the runtime.
        let updated = tokio::task::spawn_blocking(move || -> Result<SimilarityIndex> {
            let existing = match current {
                Some(index) => Some(index),
                None => read_existing(&path)?,
            };
            let index = match existing {
                Some(mut index) => {
                    index.add(passage)?;
                    index
                }
                None => {
                    info!("Creating new index at {:?}", path);
                    SimilarityIndex::seeded(passage)?
                }
            };
            save_index(&path, &index, &metadata)?;
            Ok(index)
        })
        .await
        .map_err(|e| CaseLinkError::Index(format!("Index writer task failed: {}", e)))??;

        let count = updated.len();
        *self.write_slot()? = Some(updated);
        info!("Index now holds {} passages", count);
        Ok(count)
    }

    /// Nearest passages to `query`.
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let slot = self.read_slot()?;
        let index = slot.as_ref().ok_or(CaseLinkError::NoIndex)?;
        index.search(query, limit)
    }

    /// Whether an index is currently available.
    pub fn is_loaded(&self) -> bool {
        self.read_slot().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Number of passages, zero when no index exists.
    pub fn len(&self) -> usize {
        self.read_slot()
            .map(|s| s.as_ref().map(|i| i.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all passages in insertion order.
    pub fn passages(&self) -> Vec<StoredPassage> {
        self.read_slot()
            .map(|s| s.as_ref().map(|i| i.passages().to_vec()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// The embedder used for passages and queries.
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        self.embedder.clone()
    }

    fn read_slot(&self) -> Result<std::sync::RwLockReadGuard<'_, Option<SimilarityIndex>>> {
        self.index
            .read()
            .map_err(|e| CaseLinkError::Index(format!("Failed to acquire lock: {}", e)))
    }

    fn write_slot(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<SimilarityIndex>>> {
        self.index
            .write()
            .map_err(|e| CaseLinkError::Index(format!("Failed to acquire lock: {}", e)))
    }
}

/// The persisted index an upsert should extend, if any.
fn read_existing(path: &Path) -> Result<Option<SimilarityIndex>> {
    match load_index(path) {
        Ok(loaded) => Ok(loaded.map(|(index, _)| index)),
        Err(e @ CaseLinkError::Load(_)) => {
            warn!("{}; replacing it with a new index", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
