//! In-process model double shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use column_matcher::tokens::TokenCounter;
use column_matcher::{Error, GenerativeModel, Result};
use regex::Regex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

type Responder = Box<dyn Fn(&[String]) -> Result<String> + Send + Sync>;

/// Answers each prompt from the batch values it finds in it.
///
/// Token cost is one per record (`{`) in the measured payload.
pub struct ScriptedModel {
    batch_value: Regex,
    respond: Responder,
    counting_fails: bool,
    count_calls: AtomicUsize,
    sent_at: Mutex<Vec<Instant>>,
}

impl ScriptedModel {
    pub fn new<F>(target_field: &str, respond: F) -> Self
    where
        F: Fn(&[String]) -> Result<String> + Send + Sync + 'static,
    {
        let pattern = format!(r#"\{{"{}":"([^"]*)"\}}"#, regex::escape(target_field));
        Self {
            batch_value: Regex::new(&pattern).unwrap(),
            respond: Box::new(respond),
            counting_fails: false,
            count_calls: AtomicUsize::new(0),
            sent_at: Mutex::new(Vec::new()),
        }
    }

    pub fn with_failing_counter(mut self) -> Self {
        self.counting_fails = true;
        self
    }

    pub fn messages_sent(&self) -> usize {
        self.sent_at.lock().unwrap().len()
    }

    pub fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenCounter for ScriptedModel {
    async fn count_tokens(&self, text: &str) -> Result<usize> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.counting_fails {
            return Err(Error::Remote {
                status: 403,
                message: "API key not valid".into(),
            });
        }
        Ok(text.matches('{').count())
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn send_message(&self, prompt: &str) -> Result<String> {
        self.sent_at.lock().unwrap().push(Instant::now());
        let values: Vec<String> = self
            .batch_value
            .captures_iter(prompt)
            .map(|c| c[1].to_string())
            .collect();
        (self.respond)(&values)
    }
}

/// Reply matching each value case-insensitively against `source`.
pub fn case_insensitive_reply(
    values: &[String],
    source: &[&str],
    target_field: &str,
    source_field: &str,
) -> String {
    let records: Vec<serde_json::Value> = values
        .iter()
        .map(|v| {
            let hit = source
                .iter()
                .find(|s| s.eq_ignore_ascii_case(v))
                .copied()
                .unwrap_or("");
            serde_json::json!({ target_field: v, source_field: hit })
        })
        .collect();
    serde_json::to_string(&records).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn numbered(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("v_{i}")).collect()
}
