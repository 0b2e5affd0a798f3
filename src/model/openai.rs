//! OpenAI-compatible backend (OpenAI, Azure-style proxies, vLLM, LiteLLM, …).
//!
//! Chat models go through `/chat/completions`. Legacy completion models
//! (`gpt-3.5-turbo-instruct`, `text-*`, `davinci*`, `babbage*`) only exist on
//! `/completions`, which takes a bare prompt and a hard token cap.

use super::http::{self, post_json, unexpected};
use super::retry::{request_with_retry, RetryPolicy};
use super::{Attempt, Model};
use crate::error::GatewayError;
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

const BACKEND: &str = "openai";

/// Token cap for the legacy `/completions` endpoint.
pub const LEGACY_MAX_TOKENS: usize = 150;

/// Which OpenAI endpoint a model lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    Chat,
    Completions,
}

impl ApiStyle {
    pub fn for_model(model: &str) -> Self {
        let m = model.to_lowercase();
        if m.ends_with("-instruct")
            || m.starts_with("text-")
            || m.starts_with("davinci")
            || m.starts_with("babbage")
        {
            ApiStyle::Completions
        } else {
            ApiStyle::Chat
        }
    }
}

/// Everything needed to talk to an OpenAI-compatible server.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
}

pub struct OpenAiModel {
    client: reqwest::Client,
    settings: OpenAiSettings,
    api: ApiStyle,
}

impl OpenAiModel {
    pub fn new(settings: OpenAiSettings) -> Result<Self, GatewayError> {
        let client = http::build_client(BACKEND, settings.timeout_secs)?;
        let api = ApiStyle::for_model(&settings.model);
        debug!("OpenAI backend: model={} api={:?}", settings.model, api);
        Ok(Self {
            client,
            settings,
            api,
        })
    }

    fn endpoint(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        match self.api {
            ApiStyle::Chat => format!("{base}/chat/completions"),
            ApiStyle::Completions => format!("{base}/completions"),
        }
    }

    fn build_body(&self, prompt: &str) -> Value {
        let s = &self.settings;
        match self.api {
            ApiStyle::Chat => {
                let mut body = json!({
                    "model": s.model,
                    "messages": [
                        { "role": "system", "content": SYSTEM_PROMPT },
                        { "role": "user",   "content": prompt }
                    ],
                    "temperature": s.temperature,
                });
                if let Some(max) = s.max_tokens {
                    body["max_tokens"] = json!(max);
                }
                body
            }
            ApiStyle::Completions => json!({
                "model": s.model,
                "prompt": prompt,
                "max_tokens": s.max_tokens.unwrap_or(LEGACY_MAX_TOKENS),
                "temperature": s.temperature,
            }),
        }
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key);

        match post_json(BACKEND, request, &self.build_body(prompt)).await {
            Ok(reply) => match extract_text(self.api, &reply) {
                Some(text) => Attempt::Success(text),
                None => unexpected(BACKEND, "reply has no choices[0] text"),
            },
            Err(attempt) => attempt,
        }
    }
}

fn extract_text(api: ApiStyle, reply: &Value) -> Option<String> {
    let choice = reply.get("choices")?.get(0)?;
    let text = match api {
        ApiStyle::Chat => choice.get("message")?.get("content")?.as_str()?,
        ApiStyle::Completions => choice.get("text")?.as_str()?,
    };
    Some(text.to_string())
}

#[async_trait]
impl Model for OpenAiModel {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn make_request(&self, prompt: &str) -> Result<(String, bool), GatewayError> {
        request_with_retry(BACKEND, &self.settings.retry, || self.attempt(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, max_tokens: Option<usize>) -> OpenAiModel {
        OpenAiModel::new(OpenAiSettings {
            api_key: "sk-test".into(),
            base_url: "https://api.example.test/v1/".into(),
            model: name.into(),
            temperature: 0.0,
            max_tokens,
            timeout_secs: 5,
            retry: RetryPolicy::default(),
        })
        .expect("client builds")
    }

    #[test]
    fn api_style_by_model_name() {
        assert_eq!(ApiStyle::for_model("gpt-3.5-turbo"), ApiStyle::Chat);
        assert_eq!(ApiStyle::for_model("gpt-4o-mini"), ApiStyle::Chat);
        assert_eq!(
            ApiStyle::for_model("gpt-3.5-turbo-instruct"),
            ApiStyle::Completions
        );
        assert_eq!(ApiStyle::for_model("text-davinci-003"), ApiStyle::Completions);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            model("gpt-4o", None).endpoint(),
            "https://api.example.test/v1/chat/completions"
        );
        assert_eq!(
            model("gpt-3.5-turbo-instruct", None).endpoint(),
            "https://api.example.test/v1/completions"
        );
    }

    #[test]
    fn chat_body_carries_prompt_as_user_turn() {
        let body = model("gpt-4o", None).build_body("Translate this");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Translate this");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn legacy_body_caps_tokens() {
        let body = model("gpt-3.5-turbo-instruct", None).build_body("Translate this");
        assert_eq!(body["prompt"], "Translate this");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["temperature"], 0.0);
    }

    #[test]
    fn extracts_text_from_both_shapes() {
        let chat = json!({"choices": [{"message": {"role": "assistant", "content": "Bonjour"}}]});
        assert_eq!(extract_text(ApiStyle::Chat, &chat).as_deref(), Some("Bonjour"));

        let legacy = json!({"choices": [{"text": "Bonjour"}]});
        assert_eq!(
            extract_text(ApiStyle::Completions, &legacy).as_deref(),
            Some("Bonjour")
        );

        assert!(extract_text(ApiStyle::Chat, &json!({"choices": []})).is_none());
    }
}
