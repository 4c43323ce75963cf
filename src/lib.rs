//! CaseLink - Video incident reports and investigative Q&A
//!
//! Turns crime-scene footage into written incident reports and lets investigators ask
//! follow-up questions answered from every report generated so far.
//!
//! # Overview
//!
//! CaseLink allows you to:
//! - Analyze a video with a multimodal model and get a structured incident report
//! - Export the report as a paginated PDF
//! - Keep every report in a persistent similarity index
//! - Ask questions in a running conversation grounded in the indexed reports
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `report` - Video analysis and PDF rendering
//! - `embedding` - Embedding generation
//! - `vector_store` - The persisted similarity index
//! - `rag` - Conversational question answering
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use caselink::config::Settings;
//! use caselink::orchestrator::Orchestrator;
//! use caselink::rag::OpenAIChatModel;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings.clone())?;
//!
//!     let result = orchestrator.generate_report(Path::new("atm_cam.mp4")).await?;
//!     println!("{}", result.report);
//!
//!     let chat_model = Arc::new(OpenAIChatModel::new(
//!         &settings.rag.model,
//!         settings.rag.temperature,
//!         settings.request_timeout(),
//!     )?);
//!     let mut conversation = orchestrator.conversation(chat_model);
//!     let response = conversation.ask("What did the suspect wear?").await?;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod report;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CaseLinkError, Result};
