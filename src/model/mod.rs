//! 生成模型模块：匹配器所依赖的远程模型抽象及其 Gemini 实现。
//!
//! # Generative Model Module
//!
//! The matcher needs exactly two things from a model: a token count that agrees
//! with the model's own tokenizer, and a single-turn `prompt -> text` call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`GenerativeModel`] | The two-operation contract (`count_tokens`, `send_message`) |
//! | [`GeminiClient`] | Google Generative Language REST implementation |

mod gemini;

pub use gemini::{GeminiClient, GeminiClientBuilder, GEMINI_API_KEY_ENV};

use crate::tokens::TokenCounter;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerativeModel: TokenCounter {
    fn model_id(&self) -> &str;

    /// Send one single-turn prompt and return the model's text reply.
    ///
    /// Implementations return [`crate::Error::Parse`] only when the endpoint
    /// answered with success but the reply had no usable text; such a call is
    /// still counted against the quota.
    async fn send_message(&self, prompt: &str) -> Result<String>;
}
