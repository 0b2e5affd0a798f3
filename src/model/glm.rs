//! ChatGLM backend: the `api.py` server shipped with ChatGLM models.
//!
//! Request: `POST <url> {"prompt": "...", "history": []}`
//! Reply:   `{"response": "...", "history": [...], "status": 200}`

use super::http::{self, post_json, unexpected};
use super::retry::{request_with_retry, RetryPolicy};
use super::{Attempt, Model};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::{json, Value};

const BACKEND: &str = "glm";

/// Default request timeout for ChatGLM servers, in seconds.
pub const DEFAULT_GLM_TIMEOUT_SECS: u64 = 30;

pub struct GlmModel {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl GlmModel {
    pub fn new(url: impl Into<String>, timeout_secs: u64, retry: RetryPolicy) -> Result<Self, GatewayError> {
        Ok(Self {
            client: http::build_client(BACKEND, timeout_secs)?,
            url: url.into(),
            retry,
        })
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let body = json!({ "prompt": prompt, "history": [] });
        match post_json(BACKEND, self.client.post(&self.url), &body).await {
            Ok(reply) => match extract_response(&reply) {
                Some(text) => Attempt::Success(text),
                None => unexpected(BACKEND, "reply has no `response` field"),
            },
            Err(attempt) => attempt,
        }
    }
}

fn extract_response(reply: &Value) -> Option<String> {
    reply.get("response")?.as_str().map(str::to_string)
}

#[async_trait]
impl Model for GlmModel {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn make_request(&self, prompt: &str) -> Result<(String, bool), GatewayError> {
        request_with_retry(BACKEND, &self.retry, || self.attempt(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_response_field() {
        let reply = json!({"response": "你好", "history": [], "status": 200});
        assert_eq!(extract_response(&reply).as_deref(), Some("你好"));
        assert!(extract_response(&json!({"status": 200})).is_none());
    }
}
