//! edgequake-llm backend: any provider the factory knows (openai, anthropic,
//! gemini, ollama, azure, …).
//!
//! The provider crate reports failures as opaque errors, so the attempt
//! outcome is read off the error text.

use super::retry::{request_with_retry, RetryPolicy};
use super::{Attempt, Model};
use crate::error::GatewayError;
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when neither the config nor `EDGEQUAKE_MODEL` names one.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    name: String,
    options: CompletionOptions,
    retry: RetryPolicy,
}

impl ProviderModel {
    /// Wrap an already constructed provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        temperature: f32,
        max_tokens: Option<usize>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens,
                ..Default::default()
            },
            retry,
        }
    }

    /// Instantiate a named provider via [`ProviderFactory::create_llm_provider`],
    /// which reads the provider's own API key variable.
    pub fn from_factory(
        provider_name: &str,
        model: &str,
        temperature: f32,
        max_tokens: Option<usize>,
        retry: RetryPolicy,
    ) -> Result<Self, GatewayError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            GatewayError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        debug!("edgequake-llm backend: provider={provider_name} model={model}");
        Ok(Self::new(provider, provider_name, temperature, max_tokens, retry))
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens",
                    self.name, response.prompt_tokens, response.completion_tokens
                );
                Attempt::Success(response.content)
            }
            Err(e) => classify_error(&self.name, &format!("{e}")),
        }
    }
}

/// Map a provider error message to an attempt outcome.
fn classify_error(backend: &str, message: &str) -> Attempt {
    let m = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| m.contains(n));

    if has(&["rate limit", "rate_limit", "ratelimit", "429", "too many requests"]) {
        Attempt::RateLimited(message.to_string())
    } else if has(&["401", "403", "unauthorized", "forbidden", "authentication", "invalid api key"]) {
        Attempt::Fatal(GatewayError::Auth {
            backend: backend.to_string(),
            detail: message.to_string(),
        })
    } else if has(&["connect", "timed out", "timeout", "dns", "network"]) {
        Attempt::Fatal(GatewayError::Connection {
            backend: backend.to_string(),
            detail: message.to_string(),
        })
    } else {
        Attempt::Rejected(message.to_string())
    }
}

#[async_trait]
impl Model for ProviderModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn make_request(&self, prompt: &str) -> Result<(String, bool), GatewayError> {
        request_with_retry(&self.name, &self.retry, || self.attempt(prompt)).await
    }
}
