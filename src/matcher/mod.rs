//! 列匹配模块：串联批次切分、限流与并发调度，完成一次完整的匹配运行。
//!
//! # Column Matching Module
//!
//! [`ColumnMatcher`] owns one run's moving parts: the model, a single shared
//! [`RateLimiter`], and the batching and dispatch settings. A run goes:
//!
//! 1. size the target column into [`Batch`]es with the model's own token counter
//!    (a counting failure aborts the run);
//! 2. hand every batch to the [`Dispatcher`], whose workers each wait for a
//!    quota slot and call the model through a [`RequestExecutor`];
//! 3. return the merged [`ResultCollection`], including one failure record per
//!    batch that did not come back cleanly.

mod executor;
mod prompt;

pub use executor::{parse_match_response, RequestExecutor};
pub use prompt::build_prompt;

use crate::batch::{Batch, Batcher, DispatchConfig, Dispatcher, ResultCollection};
use crate::config::MatcherConfig;
use crate::model::GenerativeModel;
use crate::resilience::{RateLimiter, RateLimiterConfig};
use crate::Result;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub struct ColumnMatcher<M: ?Sized> {
    model: Arc<M>,
    limiter: Arc<RateLimiter>,
    config: MatcherConfig,
}

impl<M: GenerativeModel + ?Sized + 'static> ColumnMatcher<M> {
    pub fn new(model: Arc<M>, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        let limiter = RateLimiter::new(
            RateLimiterConfig::per_minute(config.calls_per_minute).with_window(config.window()),
        );
        Ok(Self {
            model,
            limiter: Arc::new(limiter),
            config,
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Size the target column into batches without calling the generator.
    pub async fn plan(&self, target: &[String], target_field: &str) -> Result<Vec<Batch>> {
        Batcher::new(
            self.model.clone(),
            self.config.group_size,
            self.config.token_ceiling,
        )?
        .batch(target, target_field)
        .await
    }

    /// Match every target value against the source column.
    ///
    /// Only batching (token counting) failures are returned as errors; per-batch
    /// failures end up in [`ResultCollection::failures`].
    pub async fn match_columns(
        &self,
        source: &[String],
        target: &[String],
        source_field: &str,
        target_field: &str,
    ) -> Result<ResultCollection> {
        let run_id = Uuid::new_v4();
        let span = info_span!("match_run", %run_id, model = self.model.model_id());

        async move {
            let batches = self.plan(target, target_field).await?;
            info!(
                source_values = source.len(),
                target_values = target.len(),
                batches = batches.len(),
                "starting match run"
            );

            let executor = Arc::new(
                RequestExecutor::new(
                    self.model.clone(),
                    self.limiter.clone(),
                    source,
                    source_field,
                    target_field,
                )?
                .with_total_batches(batches.len()),
            );

            let dispatcher = Dispatcher::with_config(DispatchConfig::from(&self.config));
            let collection = dispatcher
                .run_all(batches, move |batch| {
                    let executor = executor.clone();
                    async move { executor.execute(&batch).await }
                })
                .await;

            info!(
                records = collection.records().len(),
                failed_batches = collection.failure_count(),
                elapsed_ms = collection.execution_time().as_millis() as u64,
                "match run finished"
            );
            Ok(collection)
        }
        .instrument(span)
        .await
    }
}
