//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::vector_store::load_index;
use anyhow::Result;

/// Run the list command.
///
/// Reads the persisted index directly; no API key is needed.
pub fn run_list(settings: Settings) -> Result<()> {
    let path = settings.index_path();

    let (index, metadata) = match load_index(&path) {
        Ok(Some(loaded)) => loaded,
        Ok(None) => {
            Output::info("No reports indexed yet. Use 'caselink report <video>' to add one.");
            return Ok(());
        }
        Err(e) => {
            Output::error(&format!("Failed to read index: {}", e));
            return Err(e.into());
        }
    };

    Output::header(&format!("Indexed Reports ({})", index.len()));
    println!();

    for passage in index.passages() {
        Output::passage_info(passage);
    }

    println!();
    Output::kv("Index", &path.display().to_string());
    Output::kv("Embedding model", &metadata.embedding_model);
    Output::kv("Dimensions", &metadata.dimensions.to_string());

    Ok(())
}
