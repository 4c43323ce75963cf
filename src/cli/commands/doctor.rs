//! Doctor command - verify credentials, directories and the index.

use crate::cli::Output;
use crate::config::Settings;
use crate::report::gemini::API_KEY_ENV as GEMINI_API_KEY;
use crate::vector_store::load_index;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("CaseLink Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    let mut section = |title: &str, results: Vec<CheckResult>| {
        println!("{}", style(title).bold());
        for check in &results {
            check.print();
        }
        println!();
        checks.extend(results);
    };

    section(
        "API Configuration",
        vec![
            check_api_key(std::env::var("OPENAI_API_KEY").ok(), "OPENAI_API_KEY", "sk-..."),
            check_api_key(std::env::var(GEMINI_API_KEY).ok(), GEMINI_API_KEY, "..."),
        ],
    );
    section("Directories", check_directories(settings));
    section("Index", vec![check_index(&settings.index_path())]);
    section("Configuration", vec![check_config_file(config_path)]);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using CaseLink.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! CaseLink is ready to use.");
    }

    Ok(())
}

/// Check that an API key is present, showing only a masked form.
fn check_api_key(value: Option<String>, var: &str, example: &str) -> CheckResult {
    let hint = format!("Set with: export {}='{}'", var, example);
    match value {
        Some(key) if key.trim().is_empty() => CheckResult::error(var, "empty", &hint),
        Some(key) if key.chars().count() > 12 => {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().skip(key.chars().count() - 4).collect();
            CheckResult::ok(var, &format!("configured ({}...{})", head, tail))
        }
        Some(_) => CheckResult::warning(var, "set but looks too short", &hint),
        None => CheckResult::error(var, "not set", &hint),
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let data_dir = settings.data_dir();
    if data_dir.exists() {
        vec![CheckResult::ok("Data directory", &format!("{}", data_dir.display()))]
    } else {
        vec![CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        )]
    }
}

/// Check whether the persisted index exists and is readable.
fn check_index(path: &Path) -> CheckResult {
    let size = std::fs::metadata(path)
        .map(|m| format_size(m.len()))
        .unwrap_or_else(|_| "unknown size".to_string());

    match load_index(path) {
        Ok(Some((index, metadata))) => CheckResult::ok(
            "Index",
            &format!(
                "{} ({} passages, {}, {})",
                path.display(),
                index.len(),
                metadata.embedding_model,
                size
            ),
        ),
        Ok(None) => CheckResult::warning(
            "Index",
            &format!("{} (not created yet)", path.display()),
            "The index is created by the first 'caselink report <video>'",
        ),
        Err(e) => CheckResult::warning(
            "Index",
            &format!("{} is unreadable: {}", path.display(), e),
            "The next report will replace it with a fresh index",
        ),
    }
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: caselink config init (or caselink config edit)",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_api_key_masking() {
        let result = check_api_key(Some("sk-abcdefghijklmnop".to_string()), "OPENAI_API_KEY", "sk-...");
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.message, "configured (sk-a...mnop)");

        assert_eq!(check_api_key(None, "GEMINI_API_KEY", "...").status, CheckStatus::Error);
        assert_eq!(check_api_key(Some(" ".into()), "GEMINI_API_KEY", "...").status, CheckStatus::Error);
        assert_eq!(check_api_key(Some("short".into()), "GEMINI_API_KEY", "...").status, CheckStatus::Warning);
    }

    #[test]
    fn test_index_checks() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("vectorstore.index");
        assert_eq!(check_index(&missing).status, CheckStatus::Warning);

        std::fs::write(&missing, b"definitely not sqlite").unwrap();
        let corrupt = check_index(&missing);
        assert_eq!(corrupt.status, CheckStatus::Warning);
        assert!(corrupt.message.contains("unreadable"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
