//! Token-bounded batching of target values.

use crate::tokens::TokenCounter;
use crate::utils::to_indented_json;
use crate::{Error, ErrorContext, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// A run of consecutive target values sent to the model in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position in the batch sequence, starting at 0.
    pub index: usize,
    pub field_name: String,
    pub values: Vec<String>,
    /// Sum of the measured token cost of the groups in this batch.
    pub token_count: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The batch in record shape: `[{field_name: value}, ...]`.
    pub fn records(&self) -> Value {
        records_for(&self.field_name, &self.values)
    }

    /// Compact JSON of [`Batch::records`], as embedded in the prompt.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.records())?)
    }
}

fn records_for(field_name: &str, values: &[String]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|v| {
                let mut record = Map::new();
                record.insert(field_name.to_string(), Value::String(v.clone()));
                Value::Object(record)
            })
            .collect(),
    )
}

/// Splits values into batches whose token cost stays under a ceiling.
///
/// Values are measured and placed in fixed-size groups; a group is never split.
/// A group that alone exceeds the ceiling still becomes its own batch.
pub struct Batcher<C> {
    counter: C,
    group_size: usize,
    token_ceiling: usize,
}

impl<C: TokenCounter> Batcher<C> {
    pub fn new(counter: C, group_size: usize, token_ceiling: usize) -> Result<Self> {
        if group_size == 0 {
            return Err(Error::configuration_with_context(
                "group size must be greater than zero",
                ErrorContext::new()
                    .with_field_path("config.group_size")
                    .with_source("batcher"),
            ));
        }
        Ok(Self {
            counter,
            group_size,
            token_ceiling,
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn token_ceiling(&self) -> usize {
        self.token_ceiling
    }

    /// Measure one group the way the model will see it.
    async fn group_cost(&self, field_name: &str, group: &[String], group_index: usize) -> Result<usize> {
        let payload = to_indented_json(&records_for(field_name, group))?;
        self.counter.count_tokens(&payload).await.map_err(|e| {
            Error::batching_with_context(
                "token count failed",
                ErrorContext::new()
                    .with_field_path(format!("group[{}]", group_index))
                    .with_details(e.to_string())
                    .with_source("batcher"),
            )
        })
    }

    pub async fn batch(&self, values: &[String], field_name: &str) -> Result<Vec<Batch>> {
        let mut batches = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_tokens = 0usize;

        for (group_index, group) in values.chunks(self.group_size).enumerate() {
            let cost = self.group_cost(field_name, group, group_index).await?;
            debug!(group = group_index, values = group.len(), tokens = cost, "measured value group");

            if current_tokens.saturating_add(cost) > self.token_ceiling {
                if !current.is_empty() {
                    close_batch(&mut batches, field_name, std::mem::take(&mut current), current_tokens);
                }
                current = group.to_vec();
                current_tokens = cost;
            } else {
                current.extend_from_slice(group);
                current_tokens = current_tokens.saturating_add(cost);
            }
        }

        if !current.is_empty() {
            close_batch(&mut batches, field_name, current, current_tokens);
        }
        Ok(batches)
    }
}

fn close_batch(batches: &mut Vec<Batch>, field_name: &str, values: Vec<String>, token_count: usize) {
    let index = batches.len();
    info!(batch = index + 1, values = values.len(), tokens = token_count, "grouped batch");
    batches.push(Batch {
        index,
        field_name: field_name.to_string(),
        values,
        token_count,
    });
}
