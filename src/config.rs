use crate::board::client::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_DEPLOY_CONCURRENCY: usize = 6;
const DEFAULT_WRITE_RETRY_LIMIT: u32 = 2;
const DEFAULT_WRITE_RETRY_BACKOFF_MS: u64 = 250;
const DEFAULT_RUN_TIMEOUT_MS: u64 = 300_000;
const DEFAULT_SCOPE_STATUS: &str = "In Marcomms";

/// Well-known board column ids the engine reads and writes. Ids are opaque
/// store identifiers; the defaults match the production board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardColumnIds {
    pub scope_status: String,
    pub content_type: String,
    pub foreign_title: String,
    /// Year for movies, season for TV, album for audio.
    pub season_year: String,
    pub cycle: String,
    pub cycle_expired: String,
    /// Mirror column used when the primary expiry column is absent.
    pub cycle_expired_fallback: String,
    pub cat_pac: String,
    pub cat_thales: String,
    pub flag_ex3: String,
    pub flag_ex2: String,
    pub flag_l3: String,
    pub flag_thales: String,
}

impl Default for BoardColumnIds {
    fn default() -> Self {
        Self {
            scope_status: "color_mksw618w".into(),
            content_type: "status_1_mkn3yyv4".into(),
            foreign_title: "text_mks31sjy".into(),
            season_year: "text_mksd2s7y".into(),
            cycle: "text_mkxga9d".into(),
            cycle_expired: "text_mm0pw9kx".into(),
            cycle_expired_fallback: "lookup_mm0p6m5c".into(),
            cat_pac: "text_mkrzy59w".into(),
            cat_thales: "text_mkrz4kqf".into(),
            flag_ex3: "boolean_mkrramxw".into(),
            flag_ex2: "boolean_mkrra4nz".into(),
            flag_l3: "boolean_mkrr1hwr".into(),
            flag_thales: "boolean_mkrrpfvg".into(),
        }
    }
}

/// Engine tunables. Defaults are production values; a YAML file can override
/// any subset.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub deploy_concurrency: usize,
    pub write_retry_limit: u32,
    pub write_retry_backoff: Duration,
    pub run_timeout: Duration,
    /// Status label that puts a record in scope for reconciliation.
    pub scope_status: String,
    pub columns: BoardColumnIds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deploy_concurrency: DEFAULT_DEPLOY_CONCURRENCY,
            write_retry_limit: DEFAULT_WRITE_RETRY_LIMIT,
            write_retry_backoff: Duration::from_millis(DEFAULT_WRITE_RETRY_BACKOFF_MS),
            run_timeout: Duration::from_millis(DEFAULT_RUN_TIMEOUT_MS),
            scope_status: DEFAULT_SCOPE_STATUS.into(),
            columns: BoardColumnIds::default(),
        }
    }
}

impl EngineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            limit: self.write_retry_limit,
            backoff: self.write_retry_backoff,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let partial: PartialConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        Ok(partial.merge_into(Self::default()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PartialConfig {
    deploy_concurrency: Option<usize>,
    write_retry_limit: Option<u32>,
    write_retry_backoff_ms: Option<u64>,
    run_timeout_ms: Option<u64>,
    scope_status: Option<String>,
    columns: Option<BoardColumnIds>,
}

impl PartialConfig {
    fn merge_into(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(v) = self.deploy_concurrency {
            config.deploy_concurrency = v.max(1);
        }
        if let Some(v) = self.write_retry_limit {
            config.write_retry_limit = v;
        }
        if let Some(v) = self.write_retry_backoff_ms {
            config.write_retry_backoff = Duration::from_millis(v);
        }
        if let Some(v) = self.run_timeout_ms {
            config.run_timeout = Duration::from_millis(v);
        }
        if let Some(v) = self.scope_status {
            config.scope_status = v;
        }
        if let Some(v) = self.columns {
            config.columns = v;
        }
        config
    }
}
