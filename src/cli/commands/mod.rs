pub mod deploy;
pub mod plan;
pub mod sheets;

use crate::cli::GlobalArgs;
use crate::config::EngineConfig;
use crate::ingest::load_workbook;
use crate::overrides::OverrideSet;
use crate::session::ReconcileSession;
use anyhow::Result;
use std::path::Path;

pub(crate) fn open_session(workbook_path: &Path, globals: &GlobalArgs) -> Result<ReconcileSession> {
    let config = match &globals.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let overrides = match &globals.overrides {
        Some(path) => OverrideSet::load(path)?,
        None => OverrideSet::default(),
    };
    let workbook = load_workbook(workbook_path)?;
    Ok(ReconcileSession::new(config, workbook, overrides)?)
}
