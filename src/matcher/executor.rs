//! Request executor: one batch in, one gated model call, parsed match records out.

use super::prompt::build_prompt;
use crate::batch::{Batch, BatchReply, MatchRecord};
use crate::model::GenerativeModel;
use crate::resilience::RateLimiter;
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").unwrap());

pub struct RequestExecutor<M: ?Sized> {
    model: Arc<M>,
    limiter: Arc<RateLimiter>,
    source_field: String,
    target_field: String,
    /// Whole source column, serialized once per run.
    source_json: String,
    total_batches: usize,
}

impl<M: GenerativeModel + ?Sized> RequestExecutor<M> {
    pub fn new(
        model: Arc<M>,
        limiter: Arc<RateLimiter>,
        source_values: &[String],
        source_field: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            model,
            limiter,
            source_field: source_field.into(),
            target_field: target_field.into(),
            source_json: serde_json::to_string(source_values)?,
            total_batches: 0,
        })
    }

    /// Only used to label progress logs ("batch 3/7").
    pub fn with_total_batches(mut self, total: usize) -> Self {
        self.total_batches = total;
        self
    }

    pub fn prompt_for(&self, batch: &Batch) -> Result<String> {
        Ok(build_prompt(
            &self.source_field,
            &self.source_json,
            &self.target_field,
            &batch.to_json()?,
        ))
    }

    /// Run one batch through the model.
    ///
    /// Transport failures are returned as errors and give the quota slot back. A
    /// reply that arrives but cannot be read (including a blocked prompt) is
    /// recorded against the quota and yields an empty [`BatchReply`] flagged as
    /// malformed.
    pub async fn execute(&self, batch: &Batch) -> Result<BatchReply> {
        let prompt = self.prompt_for(batch)?;
        info!(
            batch = batch.index + 1,
            total = self.total_batches,
            values = batch.len(),
            "executing batch"
        );

        let permit = self.limiter.acquire().await;
        let raw = match self.model.send_message(&prompt).await {
            Ok(raw) => {
                permit.record();
                raw
            }
            // The endpoint answered, so the call counts against the quota.
            Err(e) if e.is_parse() => {
                permit.record();
                warn!(batch = batch.index + 1, error = %e, "model reply carried no usable text");
                return Ok(BatchReply::malformed(batch.index, e.to_string()));
            }
            // Dropping the permit unrecorded returns its slot.
            Err(e) => return Err(e),
        };

        match parse_match_response(&raw, &self.target_field, &self.source_field, batch.index) {
            Ok(records) => Ok(BatchReply::parsed(batch.index, records)),
            Err(e) => {
                warn!(batch = batch.index + 1, error = %e, "discarding unreadable response");
                Ok(BatchReply::malformed(batch.index, e.to_string()))
            }
        }
    }
}

/// Read the model's reply as `[{target_field, source_field}, ...]`.
///
/// Elements that are not objects or lack the target field are skipped. A missing
/// or `null` source value means "no match". Non-string scalars are stringified.
pub fn parse_match_response(
    raw: &str,
    target_field: &str,
    source_field: &str,
    batch_index: usize,
) -> Result<Vec<MatchRecord>> {
    let body = match CODE_FENCE.captures(raw).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    };

    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::parse_with_context(
            "response is not valid JSON",
            ErrorContext::new()
                .with_field_path(format!("batch[{}]", batch_index))
                .with_details(e.to_string())
                .with_source("request_executor"),
        )
    })?;

    let Value::Array(items) = value else {
        return Err(Error::parse_with_context(
            "response is not a JSON array",
            ErrorContext::new()
                .with_field_path(format!("batch[{}]", batch_index))
                .with_source("request_executor"),
        ));
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let target = cell_text(obj.get(target_field)?);
            let source = obj.get(source_field).map(cell_text).unwrap_or_default();
            Some(MatchRecord::new(batch_index, target, source))
        })
        .collect())
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
