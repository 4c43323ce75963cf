//! Configuration module for CaseLink.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, RagPrompts, ReportPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, IndexSettings, PromptSettings, RagSettings,
    ReportSettings, ServerSettings, Settings,
};
