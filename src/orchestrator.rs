//! Pipeline orchestrator for CaseLink.
//!
//! Wires the report generator, the shared index and the conversation loop together.

use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::rag::{ChatModel, ConversationChain};
use crate::report::{GeminiReportGenerator, ReportGenerator, VideoAsset};
use crate::vector_store::IndexManager;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// The main orchestrator for the CaseLink pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    generator: Option<Arc<dyn ReportGenerator>>,
    index: Arc<IndexManager>,
}

impl Orchestrator {
    /// Create a new orchestrator from settings.
    ///
    /// The persisted index is loaded immediately; an unreadable index is replaced by an
    /// empty one. The report generator is only required once a report is requested, so a
    /// missing `GEMINI_API_KEY` does not prevent question answering.
    pub fn new(settings: Settings) -> Result<Self> {
        // Load prompts (with optional custom directory and variables)
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
            settings.request_timeout(),
        )?);

        let index = Arc::new(IndexManager::open(settings.index_path(), embedder));
        info!("Index at {:?} holds {} passages", index.path(), index.len());

        let generator = match GeminiReportGenerator::from_env(&settings.report, &prompts.report.instruction) {
            Ok(g) => Some(Arc::new(g) as Arc<dyn ReportGenerator>),
            Err(e) => {
                debug!("Report generator unavailable: {}", e);
                None
            }
        };

        Ok(Self {
            settings,
            prompts,
            generator,
            index,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        generator: Arc<dyn ReportGenerator>,
        index: Arc<IndexManager>,
    ) -> Self {
        Self {
            settings,
            prompts,
            generator: Some(generator),
            index,
        }
    }

    /// Get a reference to the shared index.
    pub fn index(&self) -> Arc<IndexManager> {
        self.index.clone()
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the loaded prompts.
    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    /// Analyze a video, then add the report to the index.
    ///
    /// Nothing is indexed when generation fails.
    #[instrument(skip(self), fields(video = %video_path.display()))]
    pub async fn generate_report(&self, video_path: &Path) -> Result<ReportResult> {
        let video = VideoAsset::from_path(video_path)?;
        let generator = self.report_generator()?;

        info!("Generating report for {}", video.display_name);
        let report = generator.generate(&video).await?;

        info!("Indexing report ({} chars)", report.len());
        let passages_indexed = self.index.upsert(&report).await?;

        Ok(ReportResult {
            report,
            passages_indexed,
        })
    }

    /// Start a conversation over the shared index.
    pub fn conversation(&self, chat_model: Arc<dyn ChatModel>) -> ConversationChain {
        ConversationChain::new(self.index.clone(), chat_model)
            .with_top_k(self.settings.rag.top_k)
            .with_prompts(self.prompts.clone())
            .with_condense_followups(self.settings.rag.condense_followups)
    }

    fn report_generator(&self) -> Result<Arc<dyn ReportGenerator>> {
        match &self.generator {
            Some(generator) => Ok(generator.clone()),
            // Surfaces the credential error to the caller.
            None => Ok(Arc::new(GeminiReportGenerator::from_env(
                &self.settings.report,
                &self.prompts.report.instruction,
            )?)),
        }
    }
}

/// Result of generating a report.
#[derive(Debug)]
pub struct ReportResult {
    /// The generated report text.
    pub report: String,
    /// Number of passages in the index after indexing the report.
    pub passages_indexed: usize,
}
