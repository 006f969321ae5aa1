//! Result collection: merged match records plus per-batch failures.

use crate::Error;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// One target value paired with its matched source value ("" when unmatched).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchRecord {
    pub batch_index: usize,
    pub target: String,
    pub source: String,
}

impl MatchRecord {
    pub fn new(batch_index: usize, target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            batch_index,
            target: target.into(),
            source: source.into(),
        }
    }

    pub fn is_matched(&self) -> bool {
        !self.source.is_empty()
    }

    /// `{target_field: target, source_field: source}`, the exported record shape.
    pub fn to_json(&self, target_field: &str, source_field: &str) -> Value {
        let mut obj = Map::new();
        obj.insert(target_field.to_string(), Value::String(self.target.clone()));
        obj.insert(source_field.to_string(), Value::String(self.source.clone()));
        Value::Object(obj)
    }
}

/// What one batch task handed back to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReply {
    pub batch_index: usize,
    pub records: Vec<MatchRecord>,
    /// Set when the call succeeded but its response could not be read.
    pub malformed: Option<String>,
}

impl BatchReply {
    pub fn parsed(batch_index: usize, records: Vec<MatchRecord>) -> Self {
        Self {
            batch_index,
            records,
            malformed: None,
        }
    }

    pub fn malformed(batch_index: usize, reason: impl Into<String>) -> Self {
        Self {
            batch_index,
            records: Vec::new(),
            malformed: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Parse,
    Panic,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Transport => "transport",
            FailureKind::Parse => "parse",
            FailureKind::Panic => "panic",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub kind: FailureKind,
    pub reason: String,
}

impl BatchFailure {
    pub fn new(batch_index: usize, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            batch_index,
            kind,
            reason: reason.into(),
        }
    }

    pub fn from_error(batch_index: usize, err: &Error) -> Self {
        let kind = if err.is_parse() {
            FailureKind::Parse
        } else {
            FailureKind::Transport
        };
        Self::new(batch_index, kind, err.to_string())
    }
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} failed ({}): {}",
            self.batch_index + 1,
            self.kind,
            self.reason
        )
    }
}

/// Everything a run produced, in merge (completion) order unless sorted.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    records: Vec<MatchRecord>,
    failures: Vec<BatchFailure>,
    total_batches: usize,
    attempted: usize,
    execution_time: Duration,
}

impl ResultCollection {
    pub fn new(total_batches: usize) -> Self {
        Self {
            total_batches,
            ..Self::default()
        }
    }

    /// Append one batch's reply. A malformed reply also counts as a failure.
    pub fn merge(&mut self, reply: BatchReply) {
        self.attempted += 1;
        if let Some(reason) = reply.malformed {
            self.failures
                .push(BatchFailure::new(reply.batch_index, FailureKind::Parse, reason));
        }
        self.records.extend(reply.records);
    }

    pub fn add_failure(&mut self, failure: BatchFailure) {
        self.attempted += 1;
        self.failures.push(failure);
    }

    /// Order records (and failures) by originating batch; within a batch, reply order is kept.
    pub fn sort_by_batch(&mut self) {
        self.records.sort_by_key(|r| r.batch_index);
        self.failures.sort_by_key(|f| f.batch_index);
    }

    pub(crate) fn set_execution_time(&mut self, elapsed: Duration) {
        self.execution_time = elapsed;
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn into_records(self) -> Vec<MatchRecord> {
        self.records
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }

    pub fn execution_time(&self) -> Duration {
        self.execution_time
    }

    /// Every submitted batch either returned or failed.
    pub fn is_complete(&self) -> bool {
        self.attempted == self.total_batches
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn matched_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_matched()).count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_batches == 0 {
            0.0
        } else {
            self.success_count() as f64 / self.total_batches as f64
        }
    }

    /// The exported document: an array of `{target_field, source_field}` objects.
    pub fn to_json(&self, target_field: &str, source_field: &str) -> Value {
        Value::Array(
            self.records
                .iter()
                .map(|r| r.to_json(target_field, source_field))
                .collect(),
        )
    }
}
