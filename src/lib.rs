//! # column-matcher
//!
//! 使用生成式模型匹配两列表格数据：按 Token 预算分批、按分钟配额限流、并发调度并汇总结果。
//!
//! Match a "target" column against a "source" column with a generative model.
//!
//! ## Overview
//!
//! Each target value is paired with its closest source value, or left unmatched.
//! The model does the judging; this crate does the plumbing around it:
//!
//! - **Batching**: target values are packed into requests that stay under a token
//!   ceiling, measured with the model's own tokenizer ([`batch::Batcher`])
//! - **Throughput control**: one shared rolling-window quota gate per run
//!   ([`resilience::RateLimiter`])
//! - **Concurrent dispatch**: a bounded worker pool that survives individual batch
//!   failures ([`batch::Dispatcher`])
//! - **Aggregation**: an unordered [`batch::ResultCollection`] with a failure record
//!   for every batch that did not come back cleanly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use column_matcher::{ColumnMatcher, GeminiClient, MatcherConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> column_matcher::Result<()> {
//!     let config = MatcherConfig::default();
//!     let model = Arc::new(GeminiClient::from_config(&config)?);
//!     let matcher = ColumnMatcher::new(model, config)?;
//!
//!     let source = vec!["Apple".to_string(), "Banana".to_string()];
//!     let target = vec!["apple".to_string(), "banana".to_string(), "Cherry".to_string()];
//!     let result = matcher
//!         .match_columns(&source, &target, "source", "target")
//!         .await?;
//!
//!     for failure in result.failures() {
//!         eprintln!("{}", failure);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Batching, dispatch and result aggregation |
//! | [`config`] | Run configuration (YAML + environment) |
//! | [`matcher`] | Request executor, prompt, and the [`ColumnMatcher`] facade |
//! | [`model`] | Generative model contract and the Gemini client |
//! | [`resilience`] | Rolling-window call quota |
//! | [`tabular`] | CSV column input and JSON/CSV export |
//! | [`tokens`] | Token counting |
//! | [`transport`] | HTTP transport |

pub mod batch;
pub mod config;
pub mod matcher;
pub mod model;
pub mod resilience;
pub mod tabular;
pub mod tokens;
pub mod transport;
pub mod utils;

// Re-export main types for convenience
pub use batch::{BatchFailure, FailureKind, MatchRecord, ResultCollection};
pub use config::MatcherConfig;
pub use matcher::ColumnMatcher;
pub use model::{GeminiClient, GenerativeModel};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
