//! SQLite persistence for the similarity index.
//!
//! The whole index is written to a single file. Each save builds a fresh database
//! next to the target and renames it into place, so the file on disk is always a
//! complete snapshot of one in-memory index.

use super::{SimilarityIndex, StoredPassage};
use crate::error::{CaseLinkError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS passages (
    id TEXT PRIMARY KEY,
    position INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);
"#;

/// Facts about how the persisted vectors were produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMetadata {
    /// Embedding model name.
    pub embedding_model: String,
    /// Vector dimensionality.
    pub dimensions: usize,
}

/// Read a persisted index.
///
/// Returns `Ok(None)` when nothing has been persisted at `path`. Any failure to read
/// an existing file is reported as [`CaseLinkError::Load`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_index(path: &Path) -> Result<Option<(SimilarityIndex, IndexMetadata)>> {
    if !path.exists() {
        debug!("No persisted index");
        return Ok(None);
    }

    let load_err = |e: rusqlite::Error| CaseLinkError::Load(format!("{}: {}", path.display(), e));

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(load_err)?;

    let mut stmt = conn
        .prepare("SELECT key, value FROM metadata")
        .map_err(load_err)?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(load_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(load_err)?;

    let lookup = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| CaseLinkError::Load(format!("Missing metadata key '{}'", key)))
    };
    let metadata = IndexMetadata {
        embedding_model: lookup("embedding_model")?,
        dimensions: lookup("dimensions")?
            .parse()
            .map_err(|e| CaseLinkError::Load(format!("Invalid dimensions: {}", e)))?,
    };

    let mut stmt = conn
        .prepare("SELECT id, content, embedding, indexed_at FROM passages ORDER BY position")
        .map_err(load_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(load_err)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(load_err)?;

    if rows.is_empty() {
        debug!("Persisted index has no passages");
        return Ok(None);
    }

    let mut passages = Vec::with_capacity(rows.len());
    for (id, text, embedding, indexed_at) in rows {
        let id = Uuid::parse_str(&id)
            .map_err(|e| CaseLinkError::Load(format!("Invalid passage id '{}': {}", id, e)))?;
        let indexed_at = DateTime::parse_from_rfc3339(&indexed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| CaseLinkError::Load(format!("Invalid timestamp: {}", e)))?;
        if embedding.len() % 4 != 0 {
            return Err(CaseLinkError::Load(format!("Corrupt embedding for passage {}", id)));
        }
        passages.push(StoredPassage {
            id,
            text,
            vector: bytes_to_embedding(&embedding),
            indexed_at,
        });
    }

    let index = SimilarityIndex::from_passages(passages)
        .map_err(|e| CaseLinkError::Load(e.to_string()))?;

    if index.dimensions() != metadata.dimensions {
        return Err(CaseLinkError::Load(format!(
            "Metadata declares {} dimensions but vectors have {}",
            metadata.dimensions,
            index.dimensions()
        )));
    }

    info!("Loaded {} passages from {:?}", index.len(), path);
    Ok(Some((index, metadata)))
}

/// Persist the whole index to `path`, replacing whatever was there.
#[instrument(skip_all, fields(path = %path.display(), passages = index.len()))]
pub fn save_index(path: &Path, index: &SimilarityIndex, metadata: &IndexMetadata) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    if staging.exists() {
        std::fs::remove_file(&staging)?;
    }

    {
        let mut conn = Connection::open(&staging)?;
        conn.execute_batch(SCHEMA)?;

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO metadata (key, value) VALUES ('embedding_model', ?1)",
            params![metadata.embedding_model],
        )?;
        tx.execute(
            "INSERT INTO metadata (key, value) VALUES ('dimensions', ?1)",
            params![metadata.dimensions.to_string()],
        )?;

        for (position, passage) in index.passages().iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO passages (id, position, content, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    passage.id.to_string(),
                    position as i64,
                    passage.text,
                    embedding_to_bytes(&passage.vector),
                    passage.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
    }

    std::fs::rename(&staging, path)?;
    info!("Saved {} passages to {:?}", index.len(), path);
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "vectorstore.index".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(dimensions: usize) -> IndexMetadata {
        IndexMetadata {
            embedding_model: "test-model".to_string(),
            dimensions,
        }
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_index(&dir.path().join("vectorstore.index")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_save_then_load_preserves_passages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vectorstore.index");

        let mut index = SimilarityIndex::seeded(StoredPassage::new(
            "Suspect fled north.".to_string(),
            vec![0.5, -1.25, 3.0],
        ))
        .unwrap();
        index
            .add(StoredPassage::new("Blue hatchback, partial plate KA-05.".to_string(), vec![1.0, 0.0, 0.0]))
            .unwrap();

        save_index(&path, &index, &metadata(3)).unwrap();
        assert!(!staging_path(&path).exists());

        let (loaded, meta) = load_index(&path).unwrap().unwrap();
        assert_eq!(meta, metadata(3));
        assert_eq!(loaded.passages(), index.passages());
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorstore.index");

        let first = SimilarityIndex::seeded(StoredPassage::new("one".to_string(), vec![1.0])).unwrap();
        save_index(&path, &first, &metadata(1)).unwrap();

        let second = SimilarityIndex::seeded(StoredPassage::new("two".to_string(), vec![2.0])).unwrap();
        save_index(&path, &second, &metadata(1)).unwrap();

        let (loaded, _) = load_index(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.passages()[0].text, "two");
    }

    #[test]
    fn test_corrupt_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectorstore.index");
        std::fs::write(&path, b"definitely not a sqlite database, just some bytes").unwrap();

        match load_index(&path) {
            Err(CaseLinkError::Load(_)) => {}
            other => panic!("expected load error, got {:?}", other.map(|o| o.is_some())),
        }
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let v = vec![0.0f32, -1.5, 42.25];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }
}
