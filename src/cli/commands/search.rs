//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::CaseLinkError;
use crate::orchestrator::Orchestrator;
use crate::rag::ContextBuilder;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let context_builder = ContextBuilder::new(orchestrator.index()).with_top_k(limit);

    let spinner = Output::spinner("Searching...");
    let results = context_builder.retrieve(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(retrieval) => {
            if retrieval.retrieved_passages.is_empty() {
                Output::warning("No results found matching your query.");
            } else {
                Output::success(&format!("Found {} results", retrieval.retrieved_passages.len()));

                for (passage, score) in retrieval
                    .retrieved_passages
                    .iter()
                    .zip(retrieval.scores.iter())
                {
                    Output::search_result(passage, *score);
                }
            }
        }
        Err(CaseLinkError::NoIndex) => {
            Output::warning(&CaseLinkError::NoIndex.to_string());
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
