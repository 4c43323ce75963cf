//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials are available before starting operations that would
//! otherwise fail midway, for example after a long video upload.

use crate::error::{CaseLinkError, Result};
use crate::report::gemini::API_KEY_ENV as GEMINI_API_KEY;

const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Reports need Gemini for analysis and OpenAI for indexing.
    Report,
    /// Asking questions needs OpenAI for embeddings and chat.
    Ask,
    /// Search needs OpenAI for the query embedding.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Report => {
            check_api_key(GEMINI_API_KEY, "...")?;
            check_api_key(OPENAI_API_KEY, "sk-...")?;
        }
        Operation::Ask | Operation::Search => {
            check_api_key(OPENAI_API_KEY, "sk-...")?;
        }
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str, example: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(CaseLinkError::Config(format!(
            "{} is empty. Set it with: export {}='{}'",
            var, var, example
        ))),
        Err(_) => Err(CaseLinkError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            var, var, example
        ))),
    }
}
