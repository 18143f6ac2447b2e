use crate::grid::Cell;
use chrono::{Datelike, Duration, NaiveDate};
use {once_cell::sync::Lazy, regex::Regex};

/// Cycle codes are airline-cycle markers: prefix + 2-digit month + 2-digit year.
pub const CYCLE_PREFIX: &str = "EK";

// Spreadsheet serial dates count days from this epoch (the 1900 date system
// including its leap-year quirk, which umya and xlsx both bake in).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

static TEXT_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/\\\-.](\d{1,2}|[A-Za-z]{3})[/\\\-.](\d{2}|\d{4})$").unwrap()
});

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a raw grid cell into a date. Accepts spreadsheet serial numbers,
/// `D/M/Y`-ordered text with numeric or 3-letter months and 2- or 4-digit
/// years, and ISO `YYYY-MM-DD` strings. Anything else is no date.
pub fn parse_cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Blank => None,
        Cell::Number(serial) => date_from_serial(*serial),
        Cell::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(serial) = trimmed.parse::<f64>() {
                return date_from_serial(serial);
            }
            if let Some(caps) = TEXT_DATE_RE.captures(trimmed) {
                let day: u32 = caps[1].parse().ok()?;
                let month = parse_month(&caps[2])?;
                let year = expand_year(&caps[3]);
                return NaiveDate::from_ymd_opt(year, month, day);
            }
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
        }
    }
}

fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_month(raw: &str) -> Option<u32> {
    if let Ok(numeric) = raw.parse::<u32>() {
        return (1..=12).contains(&numeric).then_some(numeric);
    }
    let lowered = raw.to_lowercase();
    MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| *abbr == lowered)
        .map(|idx| idx as u32 + 1)
}

fn expand_year(raw: &str) -> i32 {
    let value: i32 = raw.parse().unwrap_or(0);
    if raw.len() == 2 { 2000 + value } else { value }
}

/// Month/year token for the governing date, e.g. March 2024 -> `EK0324`.
pub fn cycle_code(date: NaiveDate) -> String {
    format!(
        "{CYCLE_PREFIX}{:02}{:02}",
        date.month(),
        date.year().rem_euclid(100)
    )
}
