//! Token counter implementations.

use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TokenCounter: Send + Sync {
    async fn count_tokens(&self, text: &str) -> Result<usize>;
}

#[async_trait]
impl<T: TokenCounter + ?Sized> TokenCounter for Arc<T> {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        (**self).count_tokens(text).await
    }
}

#[derive(Debug, Clone)]
pub struct CharacterEstimator {
    chars_per_token: f64,
}

impl CharacterEstimator {
    pub fn new() -> Self {
        Self {
            chars_per_token: 4.0,
        }
    }

    /// Estimator with a custom ratio, which must be finite and positive.
    pub fn with_ratio(chars_per_token: f64) -> Result<Self> {
        if !(chars_per_token.is_finite() && chars_per_token > 0.0) {
            return Err(Error::configuration_with_context(
                "characters per token must be a positive number",
                ErrorContext::new()
                    .with_field_path("chars_per_token")
                    .with_details(chars_per_token.to_string())
                    .with_source("character_estimator"),
            ));
        }
        Ok(Self { chars_per_token })
    }
}

impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCounter for CharacterEstimator {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok((text.chars().count() as f64 / self.chars_per_token).ceil() as usize)
    }
}
