//! Model interaction: one system + user exchange per chunk.
//!
//! The extractor talks to a [`ChatModel`], not to `edgequake_llm` directly.
//! [`ProviderModel`] is the production implementation; tests plug in a
//! scripted model so the whole extraction loop runs without network access.
//!
//! There is no retry loop here. A failed request is returned to the caller
//! with its provider error classified, and the extraction stops.

use crate::error::SynopsisError;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// One request to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// The model's raw reply plus token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelReply {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Something that can answer a [`PromptRequest`].
pub trait ChatModel: Send + Sync {
    /// Send one request and wait for the whole reply.
    fn complete(
        &self,
        request: &PromptRequest,
    ) -> impl Future<Output = Result<ModelReply, SynopsisError>> + Send;
}

/// [`ChatModel`] backed by an `edgequake_llm` provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    /// `label` names the provider in error messages ("openai", "auto", ...).
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ChatModel for ProviderModel {
    async fn complete(&self, request: &PromptRequest) -> Result<ModelReply, SynopsisError> {
        let messages = vec![
            ChatMessage::system(&request.system),
            ChatMessage::user(&request.user),
        ];
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_provider_error(&self.label, &e.to_string()))?;

        debug!(
            "{}: {} prompt tokens, {} completion tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(ModelReply {
            content: response.content,
            prompt_tokens: response.prompt_tokens as u64,
            completion_tokens: response.completion_tokens as u64,
        })
    }
}

fn build_options(request: &PromptRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

/// Map a provider error message onto the matching [`SynopsisError`].
///
/// Providers surface HTTP failures as formatted strings, so the status code
/// or its usual wording is all there is to go on.
pub fn classify_provider_error(provider: &str, message: &str) -> SynopsisError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
    {
        SynopsisError::RateLimitExceeded {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("invalid api key")
        || lower.contains("incorrect api key")
    {
        SynopsisError::AuthError {
            provider: provider.to_string(),
            detail: message.to_string(),
        }
    } else {
        SynopsisError::LlmApiError {
            message: format!("{provider}: {message}"),
        }
    }
}
