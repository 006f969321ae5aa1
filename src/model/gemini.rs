//! Gemini generateContent / countTokens 客户端
//!
//! Google Gemini REST client. Key differences from chat-style APIs:
//! - Uses `contents` with `parts` instead of `messages` with `content`.
//! - `generationConfig` wraps temperature, topP, topK, maxOutputTokens and responseMimeType.
//! - Response text lives at `candidates[0].content.parts[*].text`.
//! - API key is passed as `?key=` query parameter, not in headers.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::GenerativeModel;
use crate::config::{GenerationConfig, MatcherConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::tokens::TokenCounter;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Google Gemini client for token counting and single-turn generation.
pub struct GeminiClient {
    transport: HttpTransport,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Build from run configuration; the key comes from `GEMINI_API_KEY`.
    pub fn from_config(cfg: &MatcherConfig) -> Result<Self> {
        Self::builder()
            .model(cfg.model.clone())
            .base_url(cfg.base_url.clone())
            .generation(cfg.generation.clone())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
    }

    fn user_contents(text: &str) -> Value {
        json!([{ "role": "user", "parts": [{ "text": text }] }])
    }

    fn generate_body(&self, prompt: &str) -> Value {
        let g = &self.generation;
        json!({
            "contents": Self::user_contents(prompt),
            "generationConfig": {
                "temperature": g.temperature,
                "topP": g.top_p,
                "topK": g.top_k,
                "maxOutputTokens": g.max_output_tokens,
                "responseMimeType": g.response_mime_type,
            },
        })
    }

    /// `{ candidates: [{ content: { parts: [{text}] }, finishReason }] }` -> concatenated text.
    fn parse_generate_response(body: &Value) -> Result<String> {
        let text: Option<String> = body
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect()
            });

        match text {
            Some(t) if !t.is_empty() => Ok(t),
            _ => {
                let reason = body
                    .pointer("/candidates/0/finishReason")
                    .or_else(|| body.pointer("/promptFeedback/blockReason"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("none");
                Err(Error::parse_with_context(
                    "response carried no candidate text",
                    ErrorContext::new()
                        .with_field_path("candidates[0].content.parts")
                        .with_details(format!("finish reason: {}", reason))
                        .with_source("gemini"),
                ))
            }
        }
    }

    fn parse_count_response(body: &Value) -> Result<usize> {
        body.get("totalTokens")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .ok_or_else(|| {
                Error::parse_with_context(
                    "countTokens reply has no totalTokens",
                    ErrorContext::new()
                        .with_field_path("totalTokens")
                        .with_source("gemini"),
                )
            })
    }
}

#[async_trait]
impl TokenCounter for GeminiClient {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        let path = format!("/models/{}:countTokens", self.model);
        let body = json!({ "contents": Self::user_contents(text) });
        let reply = self.transport.post_json(&path, &body).await?;
        let n = Self::parse_count_response(&reply)?;
        debug!(model = %self.model, tokens = n, "counted tokens");
        Ok(n)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn send_message(&self, prompt: &str) -> Result<String> {
        let path = format!("/models/{}:generateContent", self.model);
        let reply = self
            .transport
            .post_json(&path, &self.generate_body(prompt))
            .await?;
        Self::parse_generate_response(&reply)
    }
}

pub struct GeminiClientBuilder {
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    generation: GenerationConfig,
    timeout: Duration,
}

impl GeminiClientBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            api_key: None,
            base_url: None,
            generation: GenerationConfig::default(),
            timeout: Duration::from_secs(60),
        }
    }
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<GeminiClient> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var(GEMINI_API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "API key required",
                    ErrorContext::new()
                        .with_field_path(GEMINI_API_KEY_ENV)
                        .with_source("gemini"),
                )
            })?;
        // Accept both "gemini-x" and the resource form "models/gemini-x".
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let model = model.trim_start_matches("models/").to_string();
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let transport = HttpTransport::new(&base_url, Some(api_key), self.timeout)?;
        Ok(GeminiClient {
            transport,
            model,
            generation: self.generation,
        })
    }
}

impl Default for GeminiClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
