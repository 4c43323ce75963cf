//! Report command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::report::document::write_report_pdf;
use anyhow::Result;
use console::style;
use std::path::{Path, PathBuf};

/// Run the report command.
pub async fn run_report(
    video: &str,
    output: Option<String>,
    no_pdf: bool,
    settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Report) {
        Output::error(&format!("{}", e));
        Output::info("Run 'caselink doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let output_path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&settings.report.output_file));

    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Uploading and analyzing video...");
    let result = orchestrator.generate_report(Path::new(video)).await;
    spinner.finish_and_clear();

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            Output::error(&format!("Failed to generate report: {}", e));
            return Err(e.into());
        }
    };

    Output::header("Crime Scene Report");
    println!("\n{}\n", result.report);

    Output::success(&format!(
        "Report indexed ({} in index)",
        style(result.passages_indexed).bold()
    ));

    if !no_pdf {
        let pages = write_report_pdf(&result.report, &output_path)?;
        Output::success(&format!(
            "PDF written to {} ({} page{})",
            output_path.display(),
            pages,
            if pages == 1 { "" } else { "s" }
        ));
    }

    Ok(())
}
