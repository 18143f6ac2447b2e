use crate::cli::GlobalArgs;
use crate::cli::commands::open_session;
use anyhow::Result;
use serde_json::{Value, json};
use std::path::PathBuf;

pub fn check_sheets(workbook: PathBuf, globals: &GlobalArgs) -> Result<Value> {
    let session = open_session(&workbook, globals)?;
    let resolutions = session.resolutions();
    let found = resolutions.iter().filter(|r| r.accepted).count();
    Ok(json!({
        "required": resolutions.len(),
        "found": found,
        "sheets": resolutions,
    }))
}

pub fn verify_headers(workbook: PathBuf, globals: &GlobalArgs) -> Result<Value> {
    let session = open_session(&workbook, globals)?;
    let reports = session.verify_reports();
    Ok(json!({
        "verified": reports.len(),
        "sheets": reports,
    }))
}
