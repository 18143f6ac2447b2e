use grid_reconcile::board::{Board, BoardColumnMeta, BoardRecord, ColumnValue};
use grid_reconcile::config::{BoardColumnIds, EngineConfig};
use grid_reconcile::grid::{Cell, SheetGrid, Workbook};
use serde_json::Value;

pub fn text_row(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|c| Cell::from(*c)).collect()
}

pub fn grid(rows: Vec<Vec<Cell>>) -> SheetGrid {
    SheetGrid::new(rows)
}

/// A Movies_PAC sheet with detectable headers: title/year columns, per-system
/// "From" columns, start/end dates, and a Subtitles..We Recommend category
/// block.
pub fn movies_pac_sheet(data_rows: Vec<Vec<Cell>>) -> SheetGrid {
    let mut rows = vec![text_row(&[
        "No.",
        "Title",
        "Year",
        "Start Date",
        "End Date",
        "EX3 From",
        "EX2 From",
        "3Ki From",
        "Subtitles",
        "Action",
        "Drama",
        "We Recommend",
    ])];
    rows.extend(data_rows);
    grid(rows)
}

/// Matching Thales movies sheet: title/year plus Start/End columns.
pub fn movies_thales_sheet(data_rows: Vec<Vec<Cell>>) -> SheetGrid {
    let mut rows = vec![text_row(&["No.", "Title", "Year", "Start", "End"])];
    rows.extend(data_rows);
    grid(rows)
}

pub fn movies_workbook(pac_rows: Vec<Vec<Cell>>, thales_rows: Vec<Vec<Cell>>) -> Workbook {
    let mut workbook = Workbook::new();
    workbook.insert("Movies_PAC", movies_pac_sheet(pac_rows));
    workbook.insert("Movies_Thales", movies_thales_sheet(thales_rows));
    workbook
}

pub fn column_ids() -> BoardColumnIds {
    EngineConfig::default().columns
}

/// Board metadata covering every target column the planner writes.
pub fn board_columns() -> Vec<BoardColumnMeta> {
    let ids = column_ids();
    [
        (ids.cycle, "Cycle"),
        (ids.cycle_expired, "Cycle Expiring"),
        (ids.cat_pac, "PAC Categories"),
        (ids.cat_thales, "Thales Categories"),
        (ids.flag_ex3, "EX3"),
        (ids.flag_ex2, "EX2"),
        (ids.flag_l3, "L3"),
        (ids.flag_thales, "Thales"),
    ]
    .into_iter()
    .map(|(id, title)| BoardColumnMeta {
        id,
        title: title.to_string(),
        kind: None,
    })
    .collect()
}

pub struct RecordBuilder {
    record: BoardRecord,
}

impl RecordBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            record: BoardRecord {
                id: id.to_string(),
                name: Some(name.to_string()),
                column_values: Vec::new(),
            },
        }
    }

    pub fn text(mut self, column_id: &str, text: &str) -> Self {
        self.record.column_values.push(ColumnValue {
            id: column_id.to_string(),
            text: Some(text.to_string()),
            value: None,
        });
        self
    }

    pub fn value(mut self, column_id: &str, value: Value) -> Self {
        self.record.column_values.push(ColumnValue {
            id: column_id.to_string(),
            text: None,
            value: Some(value),
        });
        self
    }

    pub fn in_scope(self) -> Self {
        let scope_column = column_ids().scope_status;
        self.text(&scope_column, "In Marcomms")
    }

    pub fn content_type(self, content_type: &str) -> Self {
        let column = column_ids().content_type;
        self.text(&column, content_type)
    }

    pub fn meta(self, meta: &str) -> Self {
        let column = column_ids().season_year;
        self.text(&column, meta)
    }

    pub fn build(self) -> BoardRecord {
        self.record
    }
}

pub fn board_with(records: Vec<BoardRecord>) -> Board {
    Board {
        columns: board_columns(),
        records,
    }
}
