use crate::columns::{col_index, col_letter};
use crate::grid::SheetGrid;
use crate::overrides::SheetOverride;
use crate::sheets::{Category, SheetId, SystemFlag};
use crate::text::normalize_ident;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Where a resolved mapping value came from. Every column decision merges
/// the same three layers with the same precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Override,
    Detected,
    Default,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Provenance,
}

impl<T> Resolved<T> {
    pub fn overridden(value: T) -> Self {
        Self {
            value,
            source: Provenance::Override,
        }
    }

    pub fn detected(value: T) -> Self {
        Self {
            value,
            source: Provenance::Detected,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            source: Provenance::Default,
        }
    }
}

/// Concrete mapping for one matched sheet: the merge of static defaults,
/// header detection, and operator overrides. Recomputed whenever any input
/// changes; never persisted.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ResolvedSheetConfig {
    pub id: SheetId,
    pub sheet_name: String,
    /// 0-based.
    pub header_row: Resolved<usize>,
    pub title_cols: [Resolved<String>; 2],
    /// Complete per-system map; `None` letters mark presence-only systems.
    pub systems: Vec<(SystemFlag, Resolved<Option<String>>)>,
    pub cycle_col: Resolved<String>,
    pub cycle_end_col: Resolved<String>,
    pub category_start: Resolved<String>,
    pub category_end: Resolved<String>,
    /// Row holding category labels; usually the header row.
    pub category_label_row: usize,
}

impl ResolvedSheetConfig {
    pub fn title_indices(&self) -> Vec<usize> {
        self.title_cols
            .iter()
            .filter_map(|col| col_index(&col.value))
            .collect()
    }

    pub fn system_indices(&self) -> Vec<(SystemFlag, Option<usize>)> {
        self.systems
            .iter()
            .map(|(flag, col)| (*flag, col.value.as_deref().and_then(col_index)))
            .collect()
    }

    pub fn cycle_index(&self) -> Option<usize> {
        col_index(&self.cycle_col.value)
    }

    pub fn cycle_end_index(&self) -> Option<usize> {
        col_index(&self.cycle_end_col.value)
    }

    pub fn category_indices(&self) -> Option<(usize, usize)> {
        let start = col_index(&self.category_start.value)?;
        let end = col_index(&self.category_end.value)?;
        (start <= end).then_some((start, end))
    }
}

/// Resolve all column mappings for one matched sheet.
pub fn resolve_columns(
    id: SheetId,
    sheet_name: &str,
    grid: &SheetGrid,
    detected_header_row: usize,
    override_: Option<&SheetOverride>,
) -> ResolvedSheetConfig {
    let spec = id.spec();

    let header_row = match override_.and_then(|o| o.header_row).filter(|row| *row > 0) {
        Some(row) => Resolved::overridden(row as usize - 1),
        None => Resolved::detected(detected_header_row),
    };
    let header_idx = header_row.value;

    let (detected_titles, title_source) = suggest_title_cols(id, grid, header_idx);
    let title_overrides = [
        override_.and_then(|o| o.title_1.clone()),
        override_.and_then(|o| o.title_2.clone()),
    ];
    let title_cols = [0usize, 1].map(|i| match &title_overrides[i] {
        Some(letter) if !letter.trim().is_empty() => Resolved::overridden(letter.trim().to_string()),
        _ => Resolved {
            value: detected_titles[i].clone(),
            source: title_source,
        },
    });

    let systems = resolve_system_cols(id, grid, header_idx, override_);

    let cycle_col = match override_.and_then(|o| o.cycle.as_deref()) {
        Some(letter) => Resolved::overridden(letter.trim().to_string()),
        None => suggest_cycle_col(id, grid, header_idx),
    };
    let cycle_end_col = match override_.and_then(|o| o.cycle_expired.as_deref()) {
        Some(letter) => Resolved::overridden(letter.trim().to_string()),
        None => suggest_cycle_end_col(id, grid, header_idx),
    };

    let (detected_start, detected_end) = suggest_category_range(id, grid, header_idx);
    let category_start = match override_.and_then(|o| o.cat_start.as_deref()) {
        Some(letter) if !letter.trim().is_empty() => Resolved::overridden(letter.trim().to_string()),
        _ => detected_start,
    };
    let category_end = match override_.and_then(|o| o.cat_end.as_deref()) {
        Some(letter) if !letter.trim().is_empty() => Resolved::overridden(letter.trim().to_string()),
        _ => detected_end,
    };

    ResolvedSheetConfig {
        id,
        sheet_name: sheet_name.to_string(),
        header_row,
        title_cols,
        systems,
        cycle_col,
        cycle_end_col,
        category_start,
        category_end,
        category_label_row: spec.category_label_row.unwrap_or(header_idx),
    }
}

fn header_cell(grid: &SheetGrid, header_idx: usize, col: usize) -> String {
    grid.cell_text(header_idx, col)
}

fn find_header_exact(grid: &SheetGrid, header_idx: usize, name: &str) -> Option<usize> {
    let row = grid.row(header_idx)?;
    let target = normalize_ident(name);
    (0..row.len()).find(|c| normalize_ident(&row[*c].display()) == target)
}

fn find_header_contains(
    grid: &SheetGrid,
    header_idx: usize,
    text: &str,
    rightmost: bool,
) -> Option<usize> {
    let row = grid.row(header_idx)?;
    let target = normalize_ident(text);
    let mut found = None;
    for c in 0..row.len() {
        if normalize_ident(&row[c].display()).contains(&target) {
            if !rightmost {
                return Some(c);
            }
            found = Some(c);
        }
    }
    found
}

fn find_header_by_candidates(
    grid: &SheetGrid,
    header_idx: usize,
    candidates: &[&str],
) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| find_header_exact(grid, header_idx, name))
        .or_else(|| {
            candidates
                .iter()
                .find_map(|name| find_header_contains(grid, header_idx, name, false))
        })
}

fn pair_letters(a: usize, b: usize) -> [String; 2] {
    [col_letter(a), col_letter(b)]
}

fn suggest_title_cols(id: SheetId, grid: &SheetGrid, header_idx: usize) -> ([String; 2], Provenance) {
    let spec = id.spec();
    let exact = |name: &str| find_header_exact(grid, header_idx, name);

    let detected = match spec.category {
        Category::Audio => match (exact("Artist"), exact("Album"), exact("Title")) {
            (Some(artist), Some(album), _) => Some(pair_letters(artist, album)),
            (Some(artist), None, Some(title)) => Some(pair_letters(artist, title)),
            _ => None,
        },
        Category::Movies => match (exact("Title"), exact("Original Title"), exact("Year")) {
            (Some(title), _, Some(year)) => Some(pair_letters(title, year)),
            (None, Some(original), Some(year)) => Some(pair_letters(original, year)),
            _ => None,
        },
        Category::Tv => match (exact("Title"), exact("Series"), exact("Season")) {
            (Some(title), _, Some(season)) => Some(pair_letters(title, season)),
            (None, Some(series), Some(season)) => Some(pair_letters(series, season)),
            _ => None,
        },
        Category::World => match (exact("Artist"), exact("Title")) {
            (Some(artist), Some(title)) => Some(pair_letters(artist, title)),
            _ => None,
        },
    };

    match detected {
        Some(cols) => (cols, Provenance::Detected),
        None => (
            [spec.title_cols[0].to_string(), spec.title_cols[1].to_string()],
            Provenance::Default,
        ),
    }
}

const EX3_HEADERS: &[&str] = &["ex3 from", "e x3 from", "aod ex3", "ex3"];
const EX2_HEADERS: &[&str] = &["ex2 from", "e x2 from", "aod ex2", "ex2"];
const L3_HEADERS: &[&str] = &["3ki from", "l3 from", "x series from", "3ki", "l3", "x series"];
const THALES_HEADERS: &[&str] = &["thales from", "thales", "thales file name"];

fn resolve_system_cols(
    id: SheetId,
    grid: &SheetGrid,
    header_idx: usize,
    override_: Option<&SheetOverride>,
) -> Vec<(SystemFlag, Resolved<Option<String>>)> {
    let spec = id.spec();
    let mut map: BTreeMap<SystemFlag, Resolved<Option<String>>> = BTreeMap::new();

    if let Some(flag) = spec.presence_flag {
        map.insert(flag, Resolved::fallback(None));
    } else {
        match id {
            SheetId::AudioExPac => {
                let mut found_any = false;
                for (flag, name) in [(SystemFlag::Ex3, "ex3"), (SystemFlag::Ex2, "ex2")] {
                    if let Some(col) = find_header_exact(grid, header_idx, name) {
                        map.insert(flag, Resolved::detected(Some(col_letter(col))));
                        found_any = true;
                    }
                }
                if !found_any {
                    for (flag, letter) in spec.system_cols {
                        map.insert(*flag, Resolved::fallback(Some((*letter).to_string())));
                    }
                }
            }
            SheetId::MoviesThales | SheetId::TvThales => {
                match find_header_exact(grid, header_idx, "End") {
                    Some(col) => {
                        map.insert(SystemFlag::Thales, Resolved::detected(Some(col_letter(col))));
                    }
                    None => {
                        for (flag, letter) in spec.system_cols {
                            map.insert(*flag, Resolved::fallback(Some((*letter).to_string())));
                        }
                    }
                }
            }
            _ => {
                for (flag, letter) in spec.system_cols {
                    map.insert(*flag, Resolved::fallback(Some((*letter).to_string())));
                }
                let searches = [
                    (SystemFlag::Ex3, EX3_HEADERS),
                    (SystemFlag::Ex2, EX2_HEADERS),
                    (SystemFlag::L3, L3_HEADERS),
                    (SystemFlag::Thales, THALES_HEADERS),
                ];
                for (flag, candidates) in searches {
                    if let Some(col) = find_header_by_candidates(grid, header_idx, candidates) {
                        map.insert(flag, Resolved::detected(Some(col_letter(col))));
                    }
                }
            }
        }
    }

    if let Some(override_) = override_ {
        for (flag, letter) in &override_.systems {
            map.insert(*flag, Resolved::overridden(Some(letter.trim().to_string())));
        }
    }

    // Any default system whose resolved letter went missing or unparseable
    // falls back to the static letter, so a bad override cannot silently
    // drop a system from derivation.
    for (flag, letter) in spec.system_cols {
        let usable = map
            .get(flag)
            .is_some_and(|r| r.value.as_deref().and_then(col_index).is_some());
        if !usable {
            map.insert(*flag, Resolved::fallback(Some((*letter).to_string())));
        }
    }

    map.into_iter().collect()
}

fn suggest_cycle_col(id: SheetId, grid: &SheetGrid, header_idx: usize) -> Resolved<String> {
    if id == SheetId::TvThales
        && let Some(col) = find_header_exact(grid, header_idx, "Start")
    {
        return Resolved::detected(col_letter(col));
    }
    if let Some(col) = find_header_exact(grid, header_idx, "Start Date") {
        return Resolved::detected(col_letter(col));
    }
    if let Some(col) = find_header_exact(grid, header_idx, "Start") {
        return Resolved::detected(col_letter(col));
    }
    Resolved::fallback(id.spec().cycle_col.to_string())
}

fn suggest_cycle_end_col(id: SheetId, grid: &SheetGrid, header_idx: usize) -> Resolved<String> {
    if let Some(col) = find_header_exact(grid, header_idx, "End Date") {
        return Resolved::detected(col_letter(col));
    }
    if let Some(col) = find_header_exact(grid, header_idx, "End") {
        return Resolved::detected(col_letter(col));
    }
    Resolved::fallback(id.spec().cycle_end_col.to_string())
}

fn suggest_category_range(
    id: SheetId,
    grid: &SheetGrid,
    header_idx: usize,
) -> (Resolved<String>, Resolved<String>) {
    let spec = id.spec();
    let defaults = (
        Resolved::fallback(spec.category_range.0.to_string()),
        Resolved::fallback(spec.category_range.1.to_string()),
    );

    if spec.category == Category::World {
        // World sheets carry a single label column regardless of revision.
        return (Resolved::fallback("H".into()), Resolved::fallback("H".into()));
    }

    if matches!(id, SheetId::AudioExPac | SheetId::AudioS3kiPac) {
        let channel_nos = find_header_contains(grid, header_idx, "channel nos", true);
        let we_recommend = find_header_contains(grid, header_idx, "we recommend", true);
        if let (Some(start_anchor), Some(end_anchor)) = (channel_nos, we_recommend)
            && end_anchor > start_anchor + 1
        {
            return (
                Resolved::detected(col_letter(start_anchor + 1)),
                Resolved::detected(col_letter(end_anchor - 1)),
            );
        }
    }

    if id == SheetId::AudioThales {
        let top5 = find_header_contains(grid, header_idx, "top 5", true);
        let island = find_header_contains(grid, header_idx, "island mode", false);
        if let (Some(start_anchor), Some(end_anchor)) = (top5, island)
            && end_anchor > start_anchor + 1
        {
            return (
                Resolved::detected(col_letter(start_anchor + 1)),
                Resolved::detected(col_letter(end_anchor - 1)),
            );
        }
    }

    if id == SheetId::TvPac {
        let subs = find_header_exact(grid, header_idx, "Subs");
        let first_from = find_header_exact(grid, header_idx, "From");
        if let (Some(start_anchor), Some(end_anchor)) = (subs, first_from)
            && end_anchor > start_anchor + 1
        {
            return (
                Resolved::detected(col_letter(start_anchor + 1)),
                Resolved::detected(col_letter(end_anchor - 1)),
            );
        }
    }

    let subtitle = find_header_contains(grid, header_idx, "subtitle", false);
    let we_recommend = find_header_contains(grid, header_idx, "we recommend", true);

    // Prefer ending just before the "We recommend" block when present.
    if let Some(end_anchor) = we_recommend {
        let end = end_anchor.saturating_sub(1);
        if let Some(subs) = subtitle
            && subs + 1 <= end
        {
            return (
                Resolved::detected(col_letter(subs + 1)),
                Resolved::detected(col_letter(end)),
            );
        }
        if let Some(default_start) = col_index(spec.category_range.0)
            && default_start <= end
        {
            return (
                Resolved::fallback(col_letter(default_start)),
                Resolved::detected(col_letter(end)),
            );
        }
    }

    let top5 = find_header_contains(grid, header_idx, "top 5", true);
    let island = find_header_contains(grid, header_idx, "island mode", false);
    if let (Some(start_anchor), Some(end_anchor)) = (top5, island)
        && end_anchor > start_anchor + 1
    {
        return (
            Resolved::detected(col_letter(start_anchor + 1)),
            Resolved::detected(col_letter(end_anchor - 1)),
        );
    }

    // Thales revisions often run categories from just after Top 5 to the last
    // column before a trailing mode/control block.
    if id.is_thales()
        && let Some(start_anchor) = top5
    {
        let start = start_anchor + 1;
        let end = match island {
            Some(end_anchor) => Some(end_anchor.saturating_sub(1)),
            None => col_index(spec.category_range.1),
        };
        if let Some(end) = end
            && end >= start
        {
            return (
                Resolved::detected(col_letter(start)),
                match island {
                    Some(_) => Resolved::detected(col_letter(end)),
                    None => Resolved::fallback(col_letter(end)),
                },
            );
        }
    }

    if let (Some(subs), Some(end_anchor)) = (subtitle, we_recommend)
        && end_anchor > subs
    {
        return (
            Resolved::detected(col_letter(subs + 1)),
            Resolved::detected(col_letter(end_anchor - 1)),
        );
    }

    defaults
}

/// One resolved field for the verification report.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct MappingDetail {
    pub field: String,
    pub column: String,
    pub header_value: String,
    pub note: String,
}

/// Header verification output for one sheet: each resolved letter with the
/// header text actually found there, so operators can eyeball the mapping.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HeaderVerifyReport {
    pub id: SheetId,
    pub sheet_name: String,
    /// 1-based, as operators read it.
    pub header_row: usize,
    pub details: Vec<MappingDetail>,
}

fn provenance_note(source: Provenance, detected_hint: &str) -> String {
    match source {
        Provenance::Override => "Manual override".to_string(),
        Provenance::Detected => detected_hint.to_string(),
        Provenance::Default => "Static default".to_string(),
    }
}

pub fn verify_report(config: &ResolvedSheetConfig, grid: &SheetGrid) -> HeaderVerifyReport {
    let header_idx = config.header_row.value;
    let mut details = Vec::new();
    let value_at = |letter: &str| -> String {
        col_index(letter)
            .map(|idx| header_cell(grid, header_idx, idx))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "—".to_string())
    };

    details.push(MappingDetail {
        field: "Header row".into(),
        column: "-".into(),
        header_value: (header_idx + 1).to_string(),
        note: provenance_note(config.header_row.source, "Detected title/header marker row"),
    });

    let title_labels = match config.id.category() {
        Category::Movies => ["Title", "Year"],
        Category::Tv => ["Title", "Season No."],
        Category::Audio => ["Artist", "Album"],
        Category::World => ["Artist", "Title"],
    };
    for (label, col) in title_labels.iter().zip(config.title_cols.iter()) {
        details.push(MappingDetail {
            field: (*label).into(),
            column: col.value.clone(),
            header_value: value_at(&col.value),
            note: provenance_note(col.source, "Title column match"),
        });
    }

    for (flag, col) in &config.systems {
        let (column, header_value) = match &col.value {
            Some(letter) => (letter.clone(), value_at(letter)),
            None => ("-".to_string(), "Presence-only".to_string()),
        };
        let note = if col.value.is_none() {
            format!("Presence-only: a title match in this sheet means {flag} available")
        } else {
            provenance_note(col.source, "System header match")
        };
        details.push(MappingDetail {
            field: format!("System ({flag})"),
            column,
            header_value,
            note,
        });
    }

    details.push(MappingDetail {
        field: "Cycle".into(),
        column: config.cycle_col.value.clone(),
        header_value: value_at(&config.cycle_col.value),
        note: provenance_note(config.cycle_col.source, "Start Date mapping"),
    });
    details.push(MappingDetail {
        field: "Cycle Expiring".into(),
        column: config.cycle_end_col.value.clone(),
        header_value: value_at(&config.cycle_end_col.value),
        note: provenance_note(config.cycle_end_col.source, "End Date mapping"),
    });

    let label_row = config.category_label_row;
    let label_at = |letter: &str| -> String {
        col_index(letter)
            .map(|idx| grid.cell_text(label_row, idx))
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "—".to_string())
    };
    details.push(MappingDetail {
        field: "Category range start".into(),
        column: config.category_start.value.clone(),
        header_value: label_at(&config.category_start.value),
        note: provenance_note(config.category_start.source, "Anchor header match"),
    });
    details.push(MappingDetail {
        field: "Category range end".into(),
        column: config.category_end.value.clone(),
        header_value: label_at(&config.category_end.value),
        note: provenance_note(config.category_end.source, "Anchor header match"),
    });

    HeaderVerifyReport {
        id: config.id,
        sheet_name: config.sheet_name.clone(),
        header_row: header_idx + 1,
        details,
    }
}
