//! Chat completion providers.

use super::{ConversationTurn, Role};
use crate::error::{CaseLinkError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// A hosted chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation and return the assistant's reply.
    async fn complete(&self, messages: &[ConversationTurn]) -> Result<String>;
}

/// OpenAI chat completions.
pub struct OpenAIChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn to_request_message(turn: &ConversationTurn) -> Result<ChatCompletionRequestMessage> {
    let message = match turn.role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(|e| CaseLinkError::Answer(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.clone())
            .build()
            .map_err(|e| CaseLinkError::Answer(e.to_string()))?
            .into(),
    };
    Ok(message)
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ConversationTurn]) -> Result<String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| CaseLinkError::Answer(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            CaseLinkError::OpenAI(format!("Chat API error: {}", e))
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| CaseLinkError::Answer("Empty response from model".to_string()))?
            .clone();

        debug!("Received {} chars", answer.len());
        Ok(answer)
    }
}
