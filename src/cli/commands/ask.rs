//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::CaseLinkError;
use crate::orchestrator::Orchestrator;
use crate::rag::OpenAIChatModel;
use anyhow::Result;
use std::sync::Arc;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        Output::info("Run 'caselink doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let model = model.unwrap_or_else(|| settings.rag.model.clone());
    let chat_model = Arc::new(OpenAIChatModel::new(
        &model,
        settings.rag.temperature,
        settings.request_timeout(),
    )?);

    let orchestrator = Orchestrator::new(settings)?;
    let mut conversation = orchestrator.conversation(chat_model);
    if let Some(k) = top_k {
        conversation = conversation.with_top_k(k);
    }

    let spinner = Output::spinner("Searching case reports...");
    let result = conversation.ask(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", response.answer);

            if !response.retrieval.retrieved_passages.is_empty() {
                Output::header("Sources");
                for (passage, score) in response
                    .retrieval
                    .retrieved_passages
                    .iter()
                    .zip(response.retrieval.scores.iter())
                {
                    Output::search_result(passage, *score);
                }
            }
        }
        Err(CaseLinkError::NoIndex) => {
            Output::warning(&CaseLinkError::NoIndex.to_string());
            Output::info("Run 'caselink report <video>' first.");
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
