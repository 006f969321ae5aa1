//! Token 计数模块：为批次切分提供与模型一致的 Token 统计。
//!
//! # Token Counting Module
//!
//! Batch sizing is only as good as the counter behind it, so the batcher is
//! generic over [`TokenCounter`]:
//!
//! | Counter | Description |
//! |---------|-------------|
//! | [`crate::model::GeminiClient`] | Remote `countTokens`, the same tokenizer the model bills with |
//! | [`CharacterEstimator`] | Offline approximation (4 chars ≈ 1 token) for planning and tests |
//!
//! ## Example
//!
//! ```rust
//! use column_matcher::tokens::{CharacterEstimator, TokenCounter};
//!
//! # #[tokio::main]
//! # async fn main() -> column_matcher::Result<()> {
//! let counter = CharacterEstimator::new();
//! assert_eq!(counter.count_tokens("Hello, how are you?").await?, 5);
//! # Ok(())
//! # }
//! ```

mod counter;

pub use counter::{CharacterEstimator, TokenCounter};
