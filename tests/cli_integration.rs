use assert_cmd::Command;
use grid_reconcile::board::{Board, BoardColumnMeta, BoardRecord, ColumnValue};
use serde_json::Value;
use std::path::Path;

fn write_movies_workbook(path: &Path) {
    let mut book = umya_spreadsheet::new_file();

    let _ = book.new_sheet("Movies_PAC");
    {
        let sheet = book.get_sheet_by_name_mut("Movies_PAC").unwrap();
        for (col, header) in [
            "No.",
            "Title",
            "Year",
            "Start Date",
            "End Date",
            "EX3 From",
            "EX2 From",
        ]
        .iter()
        .enumerate()
        {
            sheet
                .get_cell_mut((col as u32 + 1, 1u32))
                .set_value(*header);
        }
        sheet.get_cell_mut((2u32, 2u32)).set_value("The Great Escape");
        sheet.get_cell_mut((3u32, 2u32)).set_value("1963");
        sheet.get_cell_mut((4u32, 2u32)).set_value_number(45352);
        sheet.get_cell_mut((5u32, 2u32)).set_value("30/09/24");
        sheet.get_cell_mut((6u32, 2u32)).set_value("x");
    }

    let _ = book.new_sheet("Movies_Thales");
    {
        let sheet = book.get_sheet_by_name_mut("Movies_Thales").unwrap();
        for (col, header) in ["No.", "Title", "Year", "Start", "End"].iter().enumerate() {
            sheet
                .get_cell_mut((col as u32 + 1, 1u32))
                .set_value(*header);
        }
        sheet.get_cell_mut((2u32, 2u32)).set_value("The Great Escape");
        sheet.get_cell_mut((3u32, 2u32)).set_value("1963");
        sheet.get_cell_mut((5u32, 2u32)).set_value("31/08/24");
    }

    umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
}

fn write_board(path: &Path) {
    let board = Board {
        columns: vec![
            BoardColumnMeta {
                id: "text_mkxga9d".into(),
                title: "Cycle".into(),
                kind: None,
            },
            BoardColumnMeta {
                id: "boolean_mkrramxw".into(),
                title: "EX3".into(),
                kind: None,
            },
        ],
        records: vec![BoardRecord {
            id: "101".into(),
            name: Some("The Great Escape".into()),
            column_values: vec![
                ColumnValue {
                    id: "color_mksw618w".into(),
                    text: Some("In Marcomms".into()),
                    value: None,
                },
                ColumnValue {
                    id: "status_1_mkn3yyv4".into(),
                    text: Some("Movie".into()),
                    value: None,
                },
                ColumnValue {
                    id: "text_mksd2s7y".into(),
                    text: Some("1963".into()),
                    value: None,
                },
            ],
        }],
    };
    std::fs::write(path, serde_json::to_string_pretty(&board).unwrap()).unwrap();
}

#[test]
fn check_sheets_resolves_both_movie_tabs() {
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join("grid.xlsx");
    write_movies_workbook(&workbook);

    let output = Command::cargo_bin("grid-reconcile")
        .unwrap()
        .args(["check-sheets"])
        .arg(&workbook)
        .arg("--compact")
        .output()
        .unwrap();
    assert!(output.status.success());

    let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["required"], 9);
    let sheets = payload["sheets"].as_array().unwrap();
    let movies = sheets
        .iter()
        .find(|s| s["id"] == "Movies_PAC")
        .unwrap();
    assert_eq!(movies["matched"], "Movies_PAC");
    assert_eq!(movies["score"], 100);
    assert_eq!(movies["accepted"], true);
}

#[test]
fn plan_reports_a_ready_row_with_the_derived_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let workbook = dir.path().join("grid.xlsx");
    let board = dir.path().join("board.json");
    write_movies_workbook(&workbook);
    write_board(&board);

    let output = Command::cargo_bin("grid-reconcile")
        .unwrap()
        .args(["plan"])
        .arg(&workbook)
        .arg(&board)
        .arg("--compact")
        .output()
        .unwrap();
    assert!(output.status.success());

    let payload: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload["summary"]["in_scope"], 1);
    assert_eq!(payload["summary"]["ready"], 1);
    let row = &payload["rows"][0];
    assert_eq!(row["status"], "ready");
    assert_eq!(row["derived"]["cycle_added"], "EK0324");
}
