use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;

pub const METRIC_PATH: &str = "/api/rum/metric";
pub const DATA_PATH: &str = "/api/rum/data";

/// Outbound JSON POST. The reporter never reads responses and discards errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, path: &str, body: Value) -> Result<()>;
}

pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, path: &str, body: Value) -> Result<()> {
        let url = self.url_for(path);
        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?;
        Ok(())
    }
}

/// Keeps every post in memory. Backs `--dry-run` and tests; `failing()`
/// records the attempt and then reports an error.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(String, Value)>>,
    fail: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sent_to(&self, path: &str) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|(sent_path, _)| sent_path == path)
            .map(|(_, body)| body)
            .collect()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn post(&self, path: &str, body: Value) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((path.to_string(), body));
        if self.fail {
            return Err(anyhow!("transport offline"));
        }
        Ok(())
    }
}
