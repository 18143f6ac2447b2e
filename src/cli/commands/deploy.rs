use crate::board::client::JsonBoardClient;
use crate::cli::GlobalArgs;
use crate::cli::commands::open_session;
use crate::deploy::{ProgressHandle, deploy_plan};
use anyhow::Result;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn deploy(workbook: PathBuf, board: PathBuf, globals: &GlobalArgs) -> Result<Value> {
    let session = open_session(&workbook, globals)?;
    let client = Arc::new(JsonBoardClient::load(&board)?);
    let mut plan = session.plan(&client.board());

    let outcome = deploy_plan(
        &mut plan,
        client.clone(),
        session.config(),
        ProgressHandle::default(),
    )
    .await?;

    Ok(json!({
        "summary": plan.summary,
        "outcome": outcome,
        "rows": plan.rows,
    }))
}
