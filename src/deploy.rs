use crate::board::client::{BoardClient, ColumnWrite, update_with_retry};
use crate::config::EngineConfig;
use crate::planner::{DeployStatus, Plan};
use anyhow::{Result, bail};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinSet;

/// Aggregate run counters. `done` only ever grows within a run; every
/// counter resets when a new deploy starts.
#[derive(Debug, Clone, Copy, Default, Serialize, JsonSchema)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    done: AtomicUsize,
    total: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

/// Shared view onto a deploy run's counters; clone it before starting the
/// run to observe progress from outside.
#[derive(Clone, Default)]
pub struct ProgressHandle(Arc<Counters>);

impl ProgressHandle {
    pub fn snapshot(&self) -> Progress {
        Progress {
            done: self.0.done.load(Ordering::SeqCst),
            total: self.0.total.load(Ordering::SeqCst),
            succeeded: self.0.succeeded.load(Ordering::SeqCst),
            failed: self.0.failed.load(Ordering::SeqCst),
        }
    }

    fn reset(&self, total: usize) {
        self.0.done.store(0, Ordering::SeqCst);
        self.0.total.store(total, Ordering::SeqCst);
        self.0.succeeded.store(0, Ordering::SeqCst);
        self.0.failed.store(0, Ordering::SeqCst);
    }

    fn record(&self, succeeded: bool) {
        if succeeded {
            self.0.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.0.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.0.done.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FailedUpdate {
    pub record_id: String,
    pub message: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct DeployOutcome {
    pub progress: Progress,
    pub failed: Vec<FailedUpdate>,
}

struct WorkItem {
    row_index: usize,
    record_id: String,
    writes: Vec<ColumnWrite>,
}

/// Apply every `ready` plan row as one record write, over a fixed worker
/// pool pulling from a shared cursor. One row failing never blocks the
/// rest; rows not selected are left untouched. The whole batch runs under
/// the configured run timeout; on expiry, in-flight work is abandoned and
/// no statuses are applied.
pub async fn deploy_plan(
    plan: &mut Plan,
    client: Arc<dyn BoardClient>,
    config: &EngineConfig,
    progress: ProgressHandle,
) -> Result<DeployOutcome> {
    let work: Arc<Vec<WorkItem>> = Arc::new(
        plan.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.status == DeployStatus::Ready && !row.updates.is_empty())
            .map(|(row_index, row)| WorkItem {
                row_index,
                record_id: row.record_id.clone(),
                writes: row.updates.iter().map(|u| u.write.clone()).collect(),
            })
            .collect(),
    );

    progress.reset(work.len());
    if work.is_empty() {
        return Ok(DeployOutcome {
            progress: progress.snapshot(),
            failed: Vec::new(),
        });
    }

    let policy = config.retry_policy();
    let cursor = Arc::new(AtomicUsize::new(0));
    let results: Arc<Mutex<Vec<(usize, Result<(), String>)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(work.len())));

    let worker_count = config.deploy_concurrency.clamp(1, work.len());
    let mut workers = JoinSet::new();
    for _ in 0..worker_count {
        let work = work.clone();
        let cursor = cursor.clone();
        let results = results.clone();
        let client = client.clone();
        let progress = progress.clone();
        workers.spawn(async move {
            loop {
                let next = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(item) = work.get(next) else { break };
                let outcome =
                    update_with_retry(client.as_ref(), &item.record_id, &item.writes, policy)
                        .await;
                progress.record(outcome.is_ok());
                if let Err(err) = &outcome {
                    tracing::warn!(record_id = %item.record_id, error = %err, "record deploy failed");
                }
                results
                    .lock()
                    .push((item.row_index, outcome.map_err(|e| e.to_string())));
            }
        });
    }

    let drained = tokio::time::timeout(config.run_timeout, async {
        while workers.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        workers.abort_all();
        bail!("deploy run timed out after {:?}", config.run_timeout);
    }

    let mut failed = Vec::new();
    for (row_index, outcome) in results.lock().drain(..) {
        let row = &mut plan.rows[row_index];
        match outcome {
            Ok(()) => {
                row.status = DeployStatus::Deployed;
                row.reason = format!("Updated {} column(s).", row.updates.len());
            }
            Err(message) => {
                row.status = DeployStatus::Failed;
                row.reason = message.clone();
                failed.push(FailedUpdate {
                    record_id: row.record_id.clone(),
                    message,
                });
            }
        }
    }

    let outcome = DeployOutcome {
        progress: progress.snapshot(),
        failed,
    };
    tracing::info!(
        total = outcome.progress.total,
        succeeded = outcome.progress.succeeded,
        failed = outcome.progress.failed,
        "deploy complete"
    );
    Ok(outcome)
}
