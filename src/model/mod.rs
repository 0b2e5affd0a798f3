//! Model gateway: turn a prompt into translated text.
//!
//! Every backend implements [`Model`]. A single request is made of one or
//! more attempts; each attempt reports a tagged [`Attempt`] and the shared
//! loop in [`retry`] decides whether to wait and try again:
//!
//! ```text
//! attempt ──▶ Success(text)      → (text, true)
//!         ──▶ RateLimited        → sleep(backoff), retry; after the last attempt → ("", false)
//!         ──▶ Rejected           → ("", false), no retry
//!         ──▶ Fatal(error)       → Err(error), the whole run stops
//! ```
//!
//! The backend is chosen by [`crate::config::ModelKind`] in
//! [`create_model`]; nothing inspects the concrete type at run time.

pub mod glm;
mod http;
pub mod openai;
pub mod provider;
pub mod retry;

use crate::config::{ModelKind, TranslatorConfig, DEFAULT_OPENAI_MODEL};
use crate::document::Content;
use crate::error::{ConfigError, GatewayError, TranslatorError};
use crate::prompts;
use async_trait::async_trait;
use std::sync::Arc;

pub use glm::GlmModel;
pub use openai::OpenAiModel;
pub use provider::ProviderModel;
pub use retry::RetryPolicy;

/// API key for the OpenAI backend.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Base URL for the OpenAI backend, e.g. `https://api.openai.com/v1`.
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
/// Endpoint for the ChatGLM backend.
pub const ENV_GLM_API_URL: &str = "GLM_API_URL";
/// Provider name for the edgequake-llm backend.
pub const ENV_LLM_PROVIDER: &str = "EDGEQUAKE_LLM_PROVIDER";
/// Model id for the edgequake-llm backend.
pub const ENV_LLM_MODEL: &str = "EDGEQUAKE_MODEL";

/// Outcome of a single request attempt.
#[derive(Debug)]
pub enum Attempt {
    /// The backend answered with text.
    Success(String),
    /// The backend asked us to slow down (HTTP 429). Worth retrying.
    RateLimited(String),
    /// The backend refused this request for another reason (any non-2xx
    /// status other than 429, 401 and 403). The block fails and the run goes
    /// on; these statuses are not raised as a [`GatewayError`] even though
    /// they are unexpected. Only auth, connection and malformed-reply
    /// failures abort the run.
    Rejected(String),
    /// Retrying cannot help and the run must stop.
    Fatal(GatewayError),
}

/// A translation backend.
#[async_trait]
pub trait Model: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Build the prompt for one block. Pure; no I/O.
    fn translate_prompt(&self, content: &Content, target_language: &str) -> String {
        prompts::translate_prompt(content, target_language)
    }

    /// Send one logical request.
    ///
    /// Returns `(text, true)` on success and `("", false)` when the block
    /// should be recorded as failed (rate limit not cleared within the retry
    /// budget, or the request was rejected). `Err` only for failures that
    /// must abort the run.
    async fn make_request(&self, prompt: &str) -> Result<(String, bool), GatewayError>;
}

/// Build the backend selected by `config`, reading missing settings from the
/// process environment.
pub fn create_model(config: &TranslatorConfig) -> Result<Arc<dyn Model>, TranslatorError> {
    create_model_with_env(config, |name| std::env::var(name).ok())
}

/// Same as [`create_model`] with an explicit environment lookup.
///
/// All required settings are checked before any client is constructed;
/// every missing variable is named in a single [`ConfigError::MissingEnv`].
pub fn create_model_with_env<F>(
    config: &TranslatorConfig,
    env: F,
) -> Result<Arc<dyn Model>, TranslatorError>
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |explicit: &Option<String>, var: &str| -> Option<String> {
        explicit
            .clone()
            .or_else(|| env(var))
            .filter(|v| !v.trim().is_empty())
    };
    let retry = RetryPolicy::from_config(config);

    match config.model_kind {
        ModelKind::OpenAi => {
            let api_key = lookup(&config.api_key, ENV_OPENAI_API_KEY);
            let base_url = lookup(&config.base_url, ENV_OPENAI_BASE_URL);
            let (api_key, base_url) = match (api_key, base_url) {
                (Some(k), Some(u)) => (k, u),
                (k, u) => {
                    let mut vars = Vec::new();
                    if k.is_none() {
                        vars.push(ENV_OPENAI_API_KEY.to_string());
                    }
                    if u.is_none() {
                        vars.push(ENV_OPENAI_BASE_URL.to_string());
                    }
                    return Err(ConfigError::MissingEnv { vars }.into());
                }
            };
            let model = OpenAiModel::new(openai::OpenAiSettings {
                api_key,
                base_url,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                temperature: config.temperature,
                max_tokens: config.max_tokens,
                timeout_secs: config.request_timeout_secs,
                retry,
            })?;
            Ok(Arc::new(model))
        }
        ModelKind::Glm => {
            let url = lookup(&config.glm_url, ENV_GLM_API_URL).ok_or_else(|| {
                ConfigError::MissingEnv {
                    vars: vec![ENV_GLM_API_URL.to_string()],
                }
            })?;
            let model = GlmModel::new(url, config.request_timeout_secs, retry)?;
            Ok(Arc::new(model))
        }
        ModelKind::Provider => {
            let provider = lookup(&config.provider_name, ENV_LLM_PROVIDER).ok_or_else(|| {
                ConfigError::MissingEnv {
                    vars: vec![ENV_LLM_PROVIDER.to_string()],
                }
            })?;
            let model_id = lookup(&config.model, ENV_LLM_MODEL)
                .unwrap_or_else(|| provider::DEFAULT_PROVIDER_MODEL.to_string());
            let model = ProviderModel::from_factory(
                &provider,
                &model_id,
                config.temperature,
                config.max_tokens,
                retry,
            )?;
            Ok(Arc::new(model))
        }
    }
}
