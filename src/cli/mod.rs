pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "grid-reconcile",
    version,
    about = "Reconcile a Programme Grid workbook against a work-tracking board"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub compact: bool,

    #[arg(long, global = true)]
    pub quiet: bool,

    /// Engine config file (YAML); defaults apply when omitted.
    #[arg(long, global = true, env = "GRID_RECONCILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sheet override file (YAML).
    #[arg(long, global = true)]
    pub overrides: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Locate each required logical sheet in the workbook.
    CheckSheets { workbook: PathBuf },
    /// Report resolved column mappings with provenance per sheet.
    VerifyHeaders { workbook: PathBuf },
    /// Build the reconciliation plan against a board snapshot.
    Plan {
        workbook: PathBuf,
        board: PathBuf,
        /// Include per-record decision traces in the output.
        #[arg(long)]
        traces: bool,
    },
    /// Print the decision trace for a single record.
    Trace {
        workbook: PathBuf,
        board: PathBuf,
        record_id: String,
    },
    /// Build the plan and apply every ready row to the board.
    Deploy { workbook: PathBuf, board: PathBuf },
}

pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub overrides: Option<PathBuf>,
}

pub async fn run_command(command: Commands, globals: GlobalArgs) -> Result<Value> {
    match command {
        Commands::CheckSheets { workbook } => commands::sheets::check_sheets(workbook, &globals),
        Commands::VerifyHeaders { workbook } => {
            commands::sheets::verify_headers(workbook, &globals)
        }
        Commands::Plan {
            workbook,
            board,
            traces,
        } => commands::plan::plan(workbook, board, traces, &globals),
        Commands::Trace {
            workbook,
            board,
            record_id,
        } => commands::plan::trace(workbook, board, record_id, &globals),
        Commands::Deploy { workbook, board } => {
            commands::deploy::deploy(workbook, board, &globals).await
        }
    }
}
