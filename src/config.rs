//! Run configuration: model, sampling, batching and throughput knobs.
//!
//! Values come from built-in defaults, optionally overlaid by a YAML file and
//! then by `COLUMN_MATCHER_*` environment variables.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fixed sampling parameters sent with every `generateContent` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub model: String,
    pub base_url: String,
    pub generation: GenerationConfig,
    /// Token budget per batch, as measured by the model's own counter.
    pub token_ceiling: usize,
    /// Values are sized and placed in groups of this many; a group is never split.
    pub group_size: usize,
    /// 0 disables the rate limiter.
    pub calls_per_minute: u32,
    pub window_secs: u64,
    pub max_concurrency: usize,
    /// Sort the result collection by batch index before returning it.
    pub preserve_order: bool,
    pub timeout_secs: u64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
            token_ceiling: 4000,
            group_size: 20,
            calls_per_minute: 10,
            window_secs: 60,
            max_concurrency: 5,
            preserve_order: false,
            timeout_secs: 60,
        }
    }
}

impl MatcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML config file; missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overlay `COLUMN_MATCHER_*` environment variables.
    pub fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(model) = env::var("COLUMN_MATCHER_MODEL") {
            self.model = model;
        }
        if let Ok(url) = env::var("COLUMN_MATCHER_BASE_URL") {
            self.base_url = url;
        }
        if let Some(v) = env_parse("COLUMN_MATCHER_TOKEN_CEILING")? {
            self.token_ceiling = v;
        }
        if let Some(v) = env_parse("COLUMN_MATCHER_GROUP_SIZE")? {
            self.group_size = v;
        }
        if let Some(v) = env_parse("COLUMN_MATCHER_CALLS_PER_MINUTE")? {
            self.calls_per_minute = v;
        }
        if let Some(v) = env_parse("COLUMN_MATCHER_MAX_CONCURRENCY")? {
            self.max_concurrency = v;
        }
        if let Some(v) = env_parse("COLUMN_MATCHER_HTTP_TIMEOUT_SECS")? {
            self.timeout_secs = v;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("config.token_ceiling", self.token_ceiling == 0),
            ("config.group_size", self.group_size == 0),
            ("config.max_concurrency", self.max_concurrency == 0),
            ("config.window_secs", self.window_secs == 0),
        ];
        for (field, is_zero) in positive {
            if is_zero {
                return Err(Error::configuration_with_context(
                    "value must be greater than zero",
                    ErrorContext::new()
                        .with_field_path(field)
                        .with_source("config_validator"),
                ));
            }
        }
        if self.model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "model identifier is empty",
                ErrorContext::new()
                    .with_field_path("config.model")
                    .with_source("config_validator"),
            ));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_token_ceiling(mut self, ceiling: usize) -> Self {
        self.token_ceiling = ceiling;
        self
    }

    pub fn with_group_size(mut self, size: usize) -> Self {
        self.group_size = size;
        self
    }

    pub fn with_calls_per_minute(mut self, quota: u32) -> Self {
        self.calls_per_minute = quota;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn with_preserve_order(mut self, preserve: bool) -> Self {
        self.preserve_order = preserve;
        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            Error::configuration_with_context(
                "environment override is not a valid number",
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(raw)
                    .with_source("config_env"),
            )
        }),
        Err(_) => Ok(None),
    }
}
