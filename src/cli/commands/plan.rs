use crate::board::client::JsonBoardClient;
use crate::cli::GlobalArgs;
use crate::cli::commands::open_session;
use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::path::PathBuf;

pub fn plan(workbook: PathBuf, board: PathBuf, traces: bool, globals: &GlobalArgs) -> Result<Value> {
    let session = open_session(&workbook, globals)?;
    let client = JsonBoardClient::load(&board)?;
    let mut plan = session.plan(&client.board());
    if !traces {
        plan.traces.clear();
    }
    Ok(serde_json::to_value(plan)?)
}

pub fn trace(
    workbook: PathBuf,
    board: PathBuf,
    record_id: String,
    globals: &GlobalArgs,
) -> Result<Value> {
    let session = open_session(&workbook, globals)?;
    let client = JsonBoardClient::load(&board)?;
    let plan = session.plan(&client.board());
    let Some(trace) = plan.traces.get(&record_id) else {
        bail!("record {record_id} is not in scope for this plan");
    };
    Ok(json!({
        "record_id": record_id,
        "trace": trace,
    }))
}
