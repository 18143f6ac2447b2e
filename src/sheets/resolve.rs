use crate::grid::{SheetGrid, Workbook};
use crate::sheets::SheetId;
use crate::text::sheet_name_score;
use schemars::JsonSchema;
use serde::Serialize;
use strum::IntoEnumIterator;

/// Accept a fuzzy sheet-name match at or above this token-set score.
pub const SHEET_ACCEPT_SCORE: u32 = 45;
/// Header detection never looks past this many leading rows.
pub const HEADER_SCAN_ROWS: usize = 30;

/// Outcome of locating one logical sheet inside an ingested workbook.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SheetResolution {
    pub id: SheetId,
    /// Best-scoring actual tab name, if the workbook has any sheets at all.
    pub matched: Option<String>,
    pub score: u32,
    pub accepted: bool,
    /// Detected header row, 0-based, for the matched sheet.
    pub header_row: usize,
    pub note: String,
}

/// Locate every required logical sheet in `workbook`. Exact tab names win
/// outright; otherwise the highest token-set score is taken, ties broken by
/// tab order. Low-scoring matches are still reported, flagged unaccepted.
pub fn resolve_sheets(workbook: &Workbook) -> Vec<SheetResolution> {
    let available = workbook.sheet_names();
    SheetId::iter()
        .map(|id| resolve_one(id, workbook, &available))
        .collect()
}

fn resolve_one(id: SheetId, workbook: &Workbook, available: &[&str]) -> SheetResolution {
    let required = id.to_string();
    let matched = best_match_sheet(&required, available);
    let score = matched
        .as_deref()
        .map(|name| sheet_name_score(&required, name))
        .unwrap_or(0);
    let accepted = matched.is_some() && score >= SHEET_ACCEPT_SCORE;
    let header_row = matched
        .as_deref()
        .and_then(|name| workbook.sheet(name))
        .map(detect_header_row)
        .unwrap_or(0);
    let note = if accepted {
        format!("Token match {score}%")
    } else {
        format!("Low match score {score}%")
    };

    tracing::debug!(
        sheet = %required,
        matched = matched.as_deref().unwrap_or("-"),
        score,
        accepted,
        "resolved sheet"
    );

    SheetResolution {
        id,
        matched,
        score,
        accepted,
        header_row,
        note,
    }
}

/// Best actual tab name for a required sheet name, or `None` when the
/// workbook is empty. An exact name short-circuits the scoring pass.
pub fn best_match_sheet(required: &str, available: &[&str]) -> Option<String> {
    if available.iter().any(|name| *name == required) {
        return Some(required.to_string());
    }
    let mut best: Option<(&str, u32)> = None;
    for name in available {
        let score = sheet_name_score(required, name);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((name, score));
        }
    }
    best.map(|(name, _)| name.to_string())
}

/// First row with exactly one cell reading `title` (case-insensitive) within
/// the scan window; failing that, the first row with any content; failing
/// that, row 0.
pub fn detect_header_row(grid: &SheetGrid) -> usize {
    let scan = grid.rows.len().min(HEADER_SCAN_ROWS);
    for r in 0..scan {
        let title_cells = grid.rows[r]
            .iter()
            .filter(|cell| cell.display().eq_ignore_ascii_case("title"))
            .count();
        if title_cells == 1 {
            return r;
        }
    }
    for r in 0..scan {
        if grid.rows[r].iter().any(|cell| !cell.is_blank()) {
            return r;
        }
    }
    0
}
