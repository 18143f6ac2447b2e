use crate::errors::IngestError;
use crate::grid::{Cell, SheetGrid, Workbook};
use std::path::Path;

/// Read an `.xlsx` workbook into the engine's grid model. This adapter is
/// the only place the binary format is touched; everything downstream works
/// on raw cell values.
pub fn load_workbook(path: &Path) -> Result<Workbook, IngestError> {
    let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|err| {
        IngestError::Unreadable {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    })?;

    let mut workbook = Workbook::new();
    for sheet in book.get_sheet_collection() {
        let mut rows: Vec<Vec<Cell>> = Vec::new();
        for cell in sheet.get_cell_collection() {
            let coordinate = cell.get_coordinate();
            let row = *coordinate.get_row_num() as usize - 1;
            let col = *coordinate.get_col_num() as usize - 1;
            let raw = cell.get_value().to_string();
            if raw.is_empty() {
                continue;
            }
            if rows.len() <= row {
                rows.resize_with(row + 1, Vec::new);
            }
            if rows[row].len() <= col {
                rows[row].resize_with(col + 1, Cell::default);
            }
            rows[row][col] = cell_from_raw(raw);
        }
        workbook.insert(sheet.get_name().to_string(), SheetGrid::new(rows));
    }

    if workbook.is_empty() {
        return Err(IngestError::NoSheets);
    }
    tracing::debug!(path = %path.display(), sheets = workbook.len(), "workbook ingested");
    Ok(workbook)
}

/// Numeric cells come back rendered; only treat a value as a number when the
/// canonical rendering round-trips, so text like `007` stays text.
fn cell_from_raw(raw: String) -> Cell {
    match raw.parse::<f64>() {
        Ok(number) if Cell::Number(number).display() == raw => Cell::Number(number),
        _ => Cell::Text(raw),
    }
}
