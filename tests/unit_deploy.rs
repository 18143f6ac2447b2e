use anyhow::{Result, anyhow};
use async_trait::async_trait;
use grid_reconcile::board::client::{BoardClient, ColumnWrite, JsonBoardClient, WriteValue};
use grid_reconcile::config::EngineConfig;
use grid_reconcile::deploy::{ProgressHandle, deploy_plan};
use grid_reconcile::grid::Cell;
use grid_reconcile::overrides::OverrideSet;
use grid_reconcile::planner::{DeployRow, DeployStatus, DeployUpdate, DerivedFields, Plan};
use grid_reconcile::session::ReconcileSession;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

mod support;
use support::builders::{RecordBuilder, board_with, column_ids, movies_workbook, text_row};

struct FlakyClient {
    fail_ids: HashSet<String>,
}

#[async_trait]
impl BoardClient for FlakyClient {
    async fn update_record(&self, record_id: &str, _writes: &[ColumnWrite]) -> Result<()> {
        if self.fail_ids.contains(record_id) {
            Err(anyhow!("simulated store rejection"))
        } else {
            Ok(())
        }
    }
}

struct StuckClient;

#[async_trait]
impl BoardClient for StuckClient {
    async fn update_record(&self, _record_id: &str, _writes: &[ColumnWrite]) -> Result<()> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(())
    }
}

fn ready_row(record_id: &str) -> DeployRow {
    DeployRow {
        record_id: record_id.to_string(),
        record_name: format!("Record {record_id}"),
        record_meta: String::new(),
        content_type: "Movie".into(),
        route: None,
        match_keys: Vec::new(),
        matched_sheets: "Movies_PAC / Movies_Thales".into(),
        pac_row: Some(2),
        thales_row: None,
        presence_row: None,
        status: DeployStatus::Ready,
        reason: "1 field(s) will update.".into(),
        derived: DerivedFields::default(),
        updates: vec![DeployUpdate {
            column_id: "text_mkxga9d".into(),
            column_title: "Cycle".into(),
            current_value: String::new(),
            new_value: "EK0324".into(),
            source: "Movies_PAC:2".into(),
            write: ColumnWrite {
                column_id: "text_mkxga9d".into(),
                value: WriteValue::Text {
                    text: "EK0324".into(),
                },
            },
        }],
    }
}

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.write_retry_backoff = Duration::from_millis(1);
    config
}

#[tokio::test(flavor = "current_thread")]
async fn failures_are_isolated_and_every_row_is_accounted_for() -> Result<()> {
    let mut plan = Plan::default();
    for i in 0..10 {
        plan.rows.push(ready_row(&format!("rec-{i}")));
    }
    let mut untouched = ready_row("skipped");
    untouched.status = DeployStatus::NoMatch;
    untouched.updates.clear();
    plan.rows.push(untouched);

    let client = Arc::new(FlakyClient {
        fail_ids: ["rec-3", "rec-7"].iter().map(|s| s.to_string()).collect(),
    });
    let progress = ProgressHandle::default();
    let outcome = deploy_plan(&mut plan, client, &fast_config(), progress.clone()).await?;

    assert_eq!(outcome.progress.total, 10);
    assert_eq!(outcome.progress.done, 10);
    assert_eq!(outcome.progress.succeeded, 8);
    assert_eq!(outcome.progress.failed, 2);
    assert_eq!(outcome.failed.len(), 2);
    assert_eq!(progress.snapshot().done, 10);

    let deployed = plan
        .rows
        .iter()
        .filter(|r| r.status == DeployStatus::Deployed)
        .count();
    let failed: Vec<&DeployRow> = plan
        .rows
        .iter()
        .filter(|r| r.status == DeployStatus::Failed)
        .collect();
    assert_eq!(deployed, 8);
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|r| r.reason.contains("simulated store rejection")));
    assert!(
        failed
            .iter()
            .all(|r| r.record_id == "rec-3" || r.record_id == "rec-7")
    );

    // The non-ready row is left exactly as the planner produced it.
    let skipped = plan.rows.last().unwrap();
    assert_eq!(skipped.status, DeployStatus::NoMatch);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn run_timeout_abandons_the_batch_without_applying_statuses() {
    let mut plan = Plan::default();
    plan.rows.push(ready_row("rec-0"));

    let mut config = fast_config();
    config.run_timeout = Duration::from_millis(50);

    let result = deploy_plan(
        &mut plan,
        Arc::new(StuckClient),
        &config,
        ProgressHandle::default(),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(plan.rows[0].status, DeployStatus::Ready);
}

#[tokio::test(flavor = "current_thread")]
async fn deployed_writes_round_trip_into_a_no_changes_second_pass() -> Result<()> {
    let mut pac_row = text_row(&[
        "1",
        "The Great Escape",
        "1963",
        "",
        "30/09/24",
        "x",
        "",
        "x",
        "",
        "x",
        "",
        "",
    ]);
    pac_row[3] = Cell::Number(45352.0);
    let thales_row = text_row(&["", "The Great Escape", "1963", "", "31/08/24"]);
    let workbook = movies_workbook(vec![pac_row], vec![thales_row]);
    let session =
        ReconcileSession::new(fast_config(), workbook, OverrideSet::default()).unwrap();

    let board = board_with(vec![
        RecordBuilder::new("101", "The Great Escape")
            .in_scope()
            .content_type("Movie")
            .meta("1963")
            .build(),
    ]);

    let dir = tempfile::tempdir()?;
    let board_path = dir.path().join("board.json");
    std::fs::write(&board_path, serde_json::to_string_pretty(&board)?)?;

    let client = Arc::new(JsonBoardClient::load(&board_path)?);
    let mut plan = session.plan(&client.board());
    assert_eq!(plan.summary.ready, 1);

    let outcome = deploy_plan(
        &mut plan,
        client.clone(),
        session.config(),
        ProgressHandle::default(),
    )
    .await?;
    assert_eq!(outcome.progress.succeeded, 1);
    assert_eq!(plan.rows[0].status, DeployStatus::Deployed);

    // Reload from disk: the persisted board must now plan clean.
    let reloaded = JsonBoardClient::load(&board_path)?;
    let second = session.plan(&reloaded.board());
    assert_eq!(second.summary.ready, 0);
    assert_eq!(second.summary.no_changes, 1);
    assert_eq!(second.rows[0].status, DeployStatus::NoChanges);

    let ids = column_ids();
    let stored = reloaded.board();
    let record = stored.record("101").unwrap();
    assert_eq!(record.column_text(&ids.cycle), "EK0324");
    assert_eq!(record.checkbox_state(&ids.flag_ex3), Some(true));
    Ok(())
}
