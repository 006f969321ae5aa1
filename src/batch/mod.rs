//! 批处理模块：按 Token 预算切分目标值，并以有界并发执行批次。
//!
//! # Batching Module
//!
//! Turns an unbounded list of target values into token-safe batches and runs
//! them concurrently, merging whatever comes back.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Batcher`] | Groups values under a token ceiling, measured by a [`crate::tokens::TokenCounter`] |
//! | [`Batch`] | One request's worth of target values, with its sequence index |
//! | [`Dispatcher`] | Bounded worker pool; isolates per-batch failures |
//! | [`ResultCollection`] | Merged [`MatchRecord`]s plus one [`BatchFailure`] per failed batch |
//!
//! ## Example
//!
//! ```rust
//! use column_matcher::batch::{Batcher, BatchReply, Dispatcher, MatchRecord};
//! use column_matcher::tokens::CharacterEstimator;
//!
//! # #[tokio::main]
//! # async fn main() -> column_matcher::Result<()> {
//! let values: Vec<String> = (0..45).map(|i| format!("item-{i}")).collect();
//! let batcher = Batcher::new(CharacterEstimator::new(), 20, 4000)?;
//! let batches = batcher.batch(&values, "Item").await?;
//!
//! let result = Dispatcher::new()
//!     .run_all(batches, |batch| async move {
//!         let records = batch
//!             .values
//!             .iter()
//!             .map(|v| MatchRecord::new(batch.index, v.clone(), ""))
//!             .collect();
//!         Ok(BatchReply::parsed(batch.index, records))
//!     })
//!     .await;
//! assert!(result.is_complete());
//! assert_eq!(result.records().len(), 45);
//! # Ok(())
//! # }
//! ```
//!
//! Merge order follows completion order. Set
//! [`DispatchConfig::preserve_order`] to sort by batch index instead.

mod batcher;
mod collector;
mod executor;

pub use batcher::{Batch, Batcher};
pub use collector::{BatchFailure, BatchReply, FailureKind, MatchRecord, ResultCollection};
pub use executor::{DispatchConfig, Dispatcher};
