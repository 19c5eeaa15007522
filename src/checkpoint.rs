//! Persisted high-water mark: the newest publish timestamp a run has seen.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed store key; this service owns exactly one checkpoint.
pub const CHECKPOINT_KEY: &str = "feed-crossposter";

#[async_trait::async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Last processed publish time in epoch milliseconds, if any run
    /// committed one before.
    async fn get(&self) -> Result<Option<i64>>;
    async fn put(&self, value: i64) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    value: i64,
}

/// Key-value checkpoint store over a REST endpoint.
///
/// `GET {endpoint}/{table}/{key}` returns `{"value": <ms>}` or 404 when no
/// checkpoint exists yet; `PUT` of the same shape writes it.
pub struct RestCheckpointStore {
    client: Client,
    endpoint: String,
    table: String,
    timeout: Duration,
}

impl RestCheckpointStore {
    pub fn new(endpoint: String, table: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            table,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    fn item_url(&self) -> String {
        format!("{}/{}/{}", self.endpoint, self.table, CHECKPOINT_KEY)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for RestCheckpointStore {
    async fn get(&self) -> Result<Option<i64>> {
        let resp = self
            .client
            .get(self.item_url())
            .timeout(self.timeout)
            .send()
            .await
            .context("checkpoint get")?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp
            .error_for_status()
            .context("checkpoint get non-2xx")?
            .text()
            .await
            .context("checkpoint get body")?;
        let record: CheckpointRecord = serde_json::from_str(body.trim())
            .with_context(|| format!("parse checkpoint JSON failed, body: {}", body.trim()))?;
        Ok(Some(record.value))
    }

    async fn put(&self, value: i64) -> Result<()> {
        self.client
            .put(self.item_url())
            .timeout(self.timeout)
            .json(&CheckpointRecord { value })
            .send()
            .await
            .context("checkpoint put")?
            .error_for_status()
            .context("checkpoint put non-2xx")?;
        Ok(())
    }
}
