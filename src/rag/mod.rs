//! Conversational question answering over indexed reports.
//!
//! Each question is embedded, matched against the similarity index, and answered by a
//! chat model conditioned on the retrieved report text plus the running dialogue.

mod chain;
mod chat_model;
pub mod context;

pub use chain::{ConversationChain, RagResponse};
pub use chat_model::{ChatModel, OpenAIChatModel};
pub use context::ContextBuilder;

use crate::vector_store::StoredPassage;
use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in the dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Where a conversation turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Retrieving,
    Composing,
    AwaitingCompletion,
    Answered,
}

/// A question together with the passages retrieved for it.
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    pub question: String,
    /// Closest passages first, at most `top_k` of them.
    pub retrieved_passages: Vec<StoredPassage>,
    /// Similarity score for each retrieved passage.
    pub scores: Vec<f32>,
}
