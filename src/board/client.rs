use crate::board::{Board, ColumnValue};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Typed payload for one column write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteValue {
    Text { text: String },
    Checkbox { checked: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnWrite {
    pub column_id: String,
    pub value: WriteValue,
}

/// Seam to the external record store. One call carries every column write
/// for one record; the store applies them atomically or fails the call.
#[async_trait]
pub trait BoardClient: Send + Sync {
    async fn update_record(&self, record_id: &str, writes: &[ColumnWrite]) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub limit: u32,
    /// Base delay; attempt `n` waits `base * (n + 1)`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Single-write primitive with linear-backoff retry. Retries are local to
/// one record and never reorder or block other writes.
pub async fn update_with_retry(
    client: &dyn BoardClient,
    record_id: &str,
    writes: &[ColumnWrite],
    policy: RetryPolicy,
) -> Result<()> {
    let mut last_error = None;
    for attempt in 0..=policy.limit {
        match client.update_record(record_id, writes).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::debug!(record_id, attempt, error = %err, "record update attempt failed");
                last_error = Some(err);
                if attempt < policy.limit {
                    tokio::time::sleep(policy.backoff * (attempt + 1)).await;
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| anyhow!("update failed with no recorded error")))
}

/// File-backed board for offline runs and tests: a JSON snapshot that writes
/// mutate in place and persist back to disk after each update.
pub struct JsonBoardClient {
    path: PathBuf,
    board: Mutex<Board>,
}

impl JsonBoardClient {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read board file '{}'", path.display()))?;
        let board: Board = serde_json::from_str(&raw)
            .with_context(|| format!("invalid board file '{}'", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            board: Mutex::new(board),
        })
    }

    pub fn board(&self) -> Board {
        self.board.lock().clone()
    }

    fn persist(&self, board: &Board) -> Result<()> {
        let raw = serde_json::to_string_pretty(board)?;
        std::fs::write(&self.path, raw)
            .with_context(|| format!("failed to write board file '{}'", self.path.display()))
    }
}

#[async_trait]
impl BoardClient for JsonBoardClient {
    async fn update_record(&self, record_id: &str, writes: &[ColumnWrite]) -> Result<()> {
        let mut board = self.board.lock();
        let record = board
            .records
            .iter_mut()
            .find(|rec| rec.id == record_id)
            .ok_or_else(|| anyhow!("record {record_id} not found on board"))?;

        for write in writes {
            let (text, value) = match &write.value {
                WriteValue::Text { text } => (text.clone(), json!(text)),
                WriteValue::Checkbox { checked } => (
                    checked.to_string(),
                    json!({ "checked": if *checked { "true" } else { "false" } }),
                ),
            };
            match record
                .column_values
                .iter_mut()
                .find(|col| col.id == write.column_id)
            {
                Some(col) => {
                    col.text = Some(text);
                    col.value = Some(value);
                }
                None => record.column_values.push(ColumnValue {
                    id: write.column_id.clone(),
                    text: Some(text),
                    value: Some(value),
                }),
            }
        }

        self.persist(&board)
    }
}
