//! Batch dispatcher: bounded concurrent execution with per-batch failure isolation.

use super::batcher::Batch;
use super::collector::{BatchFailure, BatchReply, FailureKind, ResultCollection};
use crate::config::MatcherConfig;
use crate::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, warn, Instrument};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Batches allowed in flight at once.
    pub max_concurrency: usize,
    pub preserve_order: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            preserve_order: false,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }
    pub fn with_preserve_order(mut self, p: bool) -> Self {
        self.preserve_order = p;
        self
    }
}

impl From<&MatcherConfig> for DispatchConfig {
    fn from(cfg: &MatcherConfig) -> Self {
        Self {
            max_concurrency: cfg.max_concurrency,
            preserve_order: cfg.preserve_order,
        }
    }
}

pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            config: DispatchConfig::default(),
        }
    }
    pub fn with_config(config: DispatchConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run `task` once per batch on a bounded pool and merge replies as they complete.
    ///
    /// A task that errors or panics is recorded as a [`BatchFailure`]; the others keep
    /// going. Returns once every batch has either replied or failed.
    pub async fn run_all<F, Fut>(&self, batches: Vec<Batch>, task: F) -> ResultCollection
    where
        F: Fn(Batch) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<BatchReply>> + Send + 'static,
    {
        let start = Instant::now();
        let mut collection = ResultCollection::new(batches.len());
        let slots = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let task = Arc::new(task);

        let mut pending = FuturesUnordered::new();
        for batch in batches {
            let index = batch.index;
            let slots = slots.clone();
            let task = task.clone();
            let handle = tokio::spawn(
                async move {
                    // The semaphore is never closed, so a permit always arrives.
                    let _slot = slots.acquire_owned().await.ok();
                    (*task)(batch).await
                }
                .in_current_span(),
            );
            pending.push(async move { (index, handle.await) });
        }

        while let Some((index, joined)) = pending.next().await {
            match joined {
                Ok(Ok(reply)) => {
                    if let Some(reason) = &reply.malformed {
                        warn!(batch = index + 1, %reason, "batch response could not be parsed");
                    } else {
                        info!(batch = index + 1, records = reply.records.len(), "batch merged");
                    }
                    collection.merge(reply);
                }
                Ok(Err(e)) => {
                    warn!(batch = index + 1, error = %e, "batch failed");
                    collection.add_failure(BatchFailure::from_error(index, &e));
                }
                Err(join_err) => {
                    warn!(batch = index + 1, error = %join_err, "batch task aborted");
                    collection.add_failure(BatchFailure::new(
                        index,
                        FailureKind::Panic,
                        join_err.to_string(),
                    ));
                }
            }
        }

        if self.config.preserve_order {
            collection.sort_by_batch();
        }
        collection.set_execution_time(start.elapsed());
        collection
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::MatchRecord;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn batches(n: usize) -> Vec<Batch> {
        (0..n)
            .map(|i| Batch {
                index: i,
                field_name: "t".into(),
                values: vec![format!("v{i}")],
                token_count: 1,
            })
            .collect()
    }

    fn echo(batch: &Batch) -> BatchReply {
        BatchReply::parsed(
            batch.index,
            batch
                .values
                .iter()
                .map(|v| MatchRecord::new(batch.index, v.clone(), v.to_uppercase()))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_pool_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::with_config(DispatchConfig::new().with_max_concurrency(3));

        let (f, p) = (in_flight.clone(), peak.clone());
        let result = dispatcher
            .run_all(batches(12), move |batch| {
                let (f, p) = (f.clone(), p.clone());
                async move {
                    let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    f.fetch_sub(1, Ordering::SeqCst);
                    Ok(echo(&batch))
                }
            })
            .await;

        assert!(result.is_complete());
        assert_eq!(result.records().len(), 12);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let result = Dispatcher::new()
            .run_all(batches(4), |batch| async move {
                match batch.index {
                    1 => Err(Error::Remote {
                        status: 500,
                        message: "internal".into(),
                    }),
                    2 => panic!("worker blew up"),
                    _ => Ok(echo(&batch)),
                }
            })
            .await;

        assert!(result.is_complete());
        assert_eq!(result.records().len(), 2);
        let mut kinds: Vec<(usize, FailureKind)> =
            result.failures().iter().map(|f| (f.batch_index, f.kind)).collect();
        kinds.sort_by_key(|(i, _)| *i);
        assert_eq!(kinds, vec![(1, FailureKind::Transport), (2, FailureKind::Panic)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_order_follows_completion_unless_preserved() {
        let slow_first = |batch: Batch| async move {
            // Earlier batches finish later.
            tokio::time::sleep(Duration::from_secs(10 - batch.index as u64)).await;
            Ok::<_, Error>(echo(&batch))
        };

        let unordered = Dispatcher::new().run_all(batches(3), slow_first).await;
        let order: Vec<usize> = unordered.records().iter().map(|r| r.batch_index).collect();
        assert_eq!(order, vec![2, 1, 0]);

        let ordered = Dispatcher::with_config(DispatchConfig::new().with_preserve_order(true))
            .run_all(batches(3), slow_first)
            .await;
        let order: Vec<usize> = ordered.records().iter().map(|r| r.batch_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_no_batches_completes_immediately() {
        let result = Dispatcher::new()
            .run_all(Vec::new(), |batch| async move { Ok(echo(&batch)) })
            .await;
        assert!(result.is_complete());
        assert_eq!(result.total_batches(), 0);
    }
}
