//! The conversational retrieval loop.

use super::context::{format_context_for_prompt, ContextBuilder};
use super::{ChatModel, ConversationTurn, RetrievalQuery, Role, TurnState};
use crate::config::Prompts;
use crate::error::{CaseLinkError, Result};
use crate::vector_store::IndexManager;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Answers questions from indexed reports while keeping a running transcript.
///
/// The transcript only ever grows by complete question/answer pairs: a turn that
/// fails at any stage leaves it untouched.
pub struct ConversationChain {
    context_builder: ContextBuilder,
    chat_model: Arc<dyn ChatModel>,
    prompts: Prompts,
    condense_followups: bool,
    transcript: Vec<ConversationTurn>,
    state: TurnState,
}

impl ConversationChain {
    /// Create a chain over `index` answering with `chat_model`.
    pub fn new(index: Arc<IndexManager>, chat_model: Arc<dyn ChatModel>) -> Self {
        Self {
            context_builder: ContextBuilder::new(index),
            chat_model,
            prompts: Prompts::default(),
            condense_followups: false,
            transcript: Vec::new(),
            state: TurnState::Idle,
        }
    }

    /// Set the number of passages retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.context_builder = self.context_builder.with_top_k(top_k);
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub fn with_condense_followups(mut self, enabled: bool) -> Self {
        self.condense_followups = enabled;
        self
    }

    /// Whether an index is available to answer from.
    pub fn has_index(&self) -> bool {
        self.context_builder.has_index()
    }

    /// Ask a question and record the answer in the transcript.
    #[instrument(skip(self), fields(question = %question))]
    pub async fn ask(&mut self, question: &str) -> Result<RagResponse> {
        let result = self.run_turn(question).await;
        self.transition(TurnState::Idle);
        result
    }

    async fn run_turn(&mut self, question: &str) -> Result<RagResponse> {
        if question.trim().is_empty() {
            return Err(CaseLinkError::InvalidInput("Question must not be empty".to_string()));
        }
        if !self.context_builder.has_index() {
            return Err(CaseLinkError::NoIndex);
        }

        info!("Processing question: {}", question);

        self.transition(TurnState::Retrieving);
        // A condensed follow-up drives both retrieval and the answer prompt.
        let standalone = if self.condense_followups && !self.transcript.is_empty() {
            self.condense(question).await?
        } else {
            question.to_string()
        };
        let retrieval = self.context_builder.retrieve(&standalone).await?;

        self.transition(TurnState::Composing);
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), format_context_for_prompt(&retrieval.retrieved_passages));
        vars.insert("question".to_string(), standalone);
        let prompt = self.prompts.render_with_custom(&self.prompts.rag.qa, &vars);

        let mut messages = self.transcript.clone();
        messages.push(ConversationTurn::user(prompt));

        self.transition(TurnState::AwaitingCompletion);
        let answer = self
            .chat_model
            .complete(&messages)
            .await
            .map_err(|e| CaseLinkError::Answer(e.to_string()))?;

        self.transition(TurnState::Answered);
        self.transcript.push(ConversationTurn::user(question));
        self.transcript.push(ConversationTurn::assistant(answer.clone()));

        debug!(
            "Answered with {} passages, transcript has {} turns",
            retrieval.retrieved_passages.len(),
            self.transcript.len()
        );

        Ok(RagResponse { answer, retrieval })
    }

    /// Turn a follow-up into a standalone question using the conversation so far.
    async fn condense(&self, question: &str) -> Result<String> {
        let chat_history = self
            .transcript
            .iter()
            .map(|turn| match turn.role {
                Role::User => format!("Human: {}", turn.content),
                Role::Assistant => format!("Assistant: {}", turn.content),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("chat_history".to_string(), chat_history);
        vars.insert("question".to_string(), question.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.rag.condense, &vars);

        let standalone = self
            .chat_model
            .complete(&[ConversationTurn::user(prompt)])
            .await
            .map_err(|e| CaseLinkError::Answer(e.to_string()))?;

        let standalone = standalone.trim();
        debug!("Condensed follow-up to: {}", standalone);
        if standalone.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(standalone.to_string())
        }
    }

    fn transition(&mut self, next: TurnState) {
        debug!("Turn state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// All completed turns, oldest first.
    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }

    /// Clear conversation history.
    pub fn clear_history(&mut self) {
        self.transcript.clear();
    }
}

/// An answer together with the passages it was conditioned on.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// The retrieval that fed the prompt.
    pub retrieval: RetrievalQuery,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.retrieval.retrieved_passages.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for (passage, score) in self
                .retrieval
                .retrieved_passages
                .iter()
                .zip(self.retrieval.scores.iter())
            {
                output.push_str(&format!(
                    "\n[{}] {} (score: {:.2})",
                    passage.indexed_at.format("%Y-%m-%d %H:%M"),
                    passage.preview(80),
                    score
                ));
            }
        }

        output
    }
}
