//! Interactive investigation chat.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::CaseLinkError;
use crate::orchestrator::Orchestrator;
use crate::rag::OpenAIChatModel;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive chat command.
///
/// A failed turn is reported and the session continues; only `exit`/`quit` or end of
/// input ends it.
pub async fn run_chat(model: Option<String>, settings: Settings) -> Result<()> {
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

    if !conversation.has_index() {
        Output::warning(&CaseLinkError::NoIndex.to_string());
        Output::info("Run 'caselink report <video>' first.");
        return Ok(());
    }

    println!("\n{}", style("CaseLink Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about the indexed reports, or 'exit' to quit. Use 'clear' to reset conversation.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            println!();
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            conversation.clear_history();
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = conversation.ask(input).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                println!("\n{} {}\n", style("CaseLink:").cyan().bold(), response.answer);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
                if !e.is_recoverable() {
                    Output::info("Run 'caselink doctor' for detailed diagnostics.");
                }
            }
        }
    }

    Ok(())
}
