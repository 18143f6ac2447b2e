use crate::board::client::{ColumnWrite, WriteValue};
use crate::board::{Board, BoardRecord, name_is_excluded, scope_status_matches};
use crate::dates::{cycle_code, parse_cell_date};
use crate::session::{ReconcileSession, SheetContext};
use crate::sheets::{SheetId, SystemFlag};
use crate::text::normalize_title;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use strum::Display;
use {once_cell::sync::Lazy, regex::Regex};

/// Content-category routing derived from a record's content-type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Route {
    Movies,
    Tv,
    Audio,
    World,
}

impl Route {
    /// World keywords are checked first: their content types also mention
    /// movies/TV and must not fall into those routes.
    pub fn from_content_type(raw: &str) -> Option<Route> {
        let t = raw.to_lowercase();
        if t.contains("emirates world") || t.contains("dubai") {
            Some(Route::World)
        } else if t.contains("movie") {
            Some(Route::Movies)
        } else if t.contains("tv") {
            Some(Route::Tv)
        } else if t.contains("music") || t.contains("podcast") {
            Some(Route::Audio)
        } else {
            None
        }
    }

    pub fn pac_sheet(self) -> SheetId {
        match self {
            Route::Movies => SheetId::MoviesPac,
            Route::Tv => SheetId::TvPac,
            Route::Audio => SheetId::AudioExPac,
            Route::World => SheetId::WorldPac,
        }
    }

    pub fn thales_sheet(self) -> SheetId {
        match self {
            Route::Movies => SheetId::MoviesThales,
            Route::Tv => SheetId::TvThales,
            Route::Audio => SheetId::AudioThales,
            Route::World => SheetId::WorldThales,
        }
    }

    pub fn presence_sheet(self) -> Option<SheetId> {
        matches!(self, Route::Audio).then_some(SheetId::AudioS3kiPac)
    }

    pub fn min_score(self) -> u32 {
        match self {
            Route::World => crate::matcher::WORLD_MATCH_THRESHOLD,
            _ => crate::matcher::MATCH_THRESHOLD,
        }
    }

    pub fn allow_containment(self) -> bool {
        self == Route::World
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeployStatus {
    Ready,
    #[default]
    NoMatch,
    /// Reserved: the planner never currently produces it.
    Ambiguous,
    NoChanges,
    Deployed,
    Failed,
}

/// One proposed column write, only emitted on a real difference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeployUpdate {
    pub column_id: String,
    pub column_title: String,
    pub current_value: String,
    pub new_value: String,
    /// Human-readable provenance: which sheet rows produced the value.
    pub source: String,
    pub write: ColumnWrite,
}

/// Values derived from the matched sheet rows, before diffing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DerivedFields {
    pub cycle_added: Option<String>,
    pub cycle_expiring: Option<String>,
    pub pac_categories: Vec<String>,
    pub thales_categories: Vec<String>,
    pub ex3: Option<bool>,
    pub ex2: Option<bool>,
    pub l3: Option<bool>,
    pub thales: Option<bool>,
}

impl DerivedFields {
    pub fn has_any(&self) -> bool {
        self.cycle_added.is_some()
            || self.cycle_expiring.is_some()
            || !self.pac_categories.is_empty()
            || !self.thales_categories.is_empty()
            || self.ex3.is_some()
            || self.ex2.is_some()
            || self.l3.is_some()
            || self.thales.is_some()
    }
}

/// One record's reconciliation outcome. Created by the planner; only the
/// deployment executor mutates it afterwards (`ready` → `deployed|failed`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeployRow {
    pub record_id: String,
    pub record_name: String,
    /// The year/season/album token, for operator display.
    pub record_meta: String,
    pub content_type: String,
    pub route: Option<Route>,
    pub match_keys: Vec<String>,
    pub matched_sheets: String,
    /// 1-based sheet rows, where matched.
    pub pac_row: Option<usize>,
    pub thales_row: Option<usize>,
    pub presence_row: Option<usize>,
    pub status: DeployStatus,
    pub reason: String,
    pub derived: DerivedFields,
    pub updates: Vec<DeployUpdate>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
pub struct PlanSummary {
    pub in_scope: usize,
    pub matched: usize,
    pub ready: usize,
    pub no_match: usize,
    pub no_changes: usize,
    pub ambiguous: usize,
}

/// Full output of one planning pass. Traces are keyed by record id and are
/// reproducible: the same inputs yield byte-identical trace text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub rows: Vec<DeployRow>,
    pub summary: PlanSummary,
    pub traces: BTreeMap<String, String>,
}

static TRUTHY_MARK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(x|✓|✔|true|yes|y|1)$").unwrap());

fn is_truthy_mark(text: &str) -> bool {
    TRUTHY_MARK_RE.is_match(text.trim())
}

fn bool_to_cell(value: Option<bool>) -> String {
    match value {
        None => String::new(),
        Some(true) => "true".to_string(),
        Some(false) => "false".to_string(),
    }
}

fn display_or_dash(text: &str) -> &str {
    if text.is_empty() { "-" } else { text }
}

struct SheetMatch<'a> {
    context: SheetContext<'a>,
    /// 0-based grid row.
    row: usize,
    key: String,
    score: u32,
}

impl SheetMatch<'_> {
    fn cycle_cell_text(&self) -> String {
        self.context
            .config
            .cycle_index()
            .map(|idx| self.context.grid.cell_text(self.row, idx))
            .unwrap_or_default()
    }

    fn cycle_date(&self) -> Option<NaiveDate> {
        let idx = self.context.config.cycle_index()?;
        parse_cell_date(self.context.grid.cell(self.row, idx))
    }

    fn expiry_date(&self) -> Option<NaiveDate> {
        let idx = self.context.config.cycle_end_index()?;
        parse_cell_date(self.context.grid.cell(self.row, idx))
    }

    fn categories(&self) -> Vec<String> {
        let Some((start, end)) = self.context.config.category_indices() else {
            return Vec::new();
        };
        let label_row = self.context.config.category_label_row;
        let mut out = Vec::new();
        for c in start..=end {
            if !is_truthy_mark(&self.context.grid.cell_text(self.row, c)) {
                continue;
            }
            let label = self.context.grid.cell_text(label_row, c);
            if !label.is_empty() {
                out.push(label);
            }
        }
        out
    }
}

/// Build the reconciliation plan for every in-scope board record.
pub fn build_plan(session: &ReconcileSession, board: &Board) -> Plan {
    let config = session.config();
    let columns = &config.columns;

    let in_scope: Vec<&BoardRecord> = board
        .records
        .iter()
        .filter(|record| {
            let status = record.column(&columns.scope_status);
            let in_scope = scope_status_matches(
                &config.scope_status,
                status.and_then(|c| c.text.as_deref()),
                status.and_then(|c| c.value.as_ref()),
            );
            in_scope && !name_is_excluded(&record.display_name())
        })
        .collect();

    // The expiry column has a mirror fallback on boards that renamed it.
    let expiry_target = if board.column_meta(&columns.cycle_expired).is_some() {
        columns.cycle_expired.clone()
    } else {
        columns.cycle_expired_fallback.clone()
    };

    let mut plan = Plan {
        summary: PlanSummary {
            in_scope: in_scope.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for record in in_scope {
        let (row, trace) = plan_record(session, board, record, &expiry_target);
        match row.status {
            DeployStatus::Ready => {
                plan.summary.matched += 1;
                plan.summary.ready += 1;
            }
            DeployStatus::NoChanges => {
                plan.summary.matched += 1;
                plan.summary.no_changes += 1;
            }
            DeployStatus::NoMatch => plan.summary.no_match += 1,
            _ => {}
        }
        plan.traces.insert(row.record_id.clone(), trace);
        plan.rows.push(row);
    }

    tracing::info!(
        in_scope = plan.summary.in_scope,
        ready = plan.summary.ready,
        no_match = plan.summary.no_match,
        no_changes = plan.summary.no_changes,
        "plan built"
    );
    plan
}

fn plan_record(
    session: &ReconcileSession,
    board: &Board,
    record: &BoardRecord,
    expiry_target: &str,
) -> (DeployRow, String) {
    let config = session.config();
    let columns = &config.columns;

    let name = record.display_name();
    let content_type = record.column_text(&columns.content_type);
    let foreign_title = record.column_text(&columns.foreign_title);
    let season_year = record.column_text(&columns.season_year);
    let route = Route::from_content_type(&content_type);

    let mut trace: Vec<String> = vec![
        format!("Record: {} ({})", display_or_dash(&name), record.id),
        format!("Content Type: {}", display_or_dash(&content_type)),
        format!(
            "Route: {}",
            route.map(|r| r.to_string()).unwrap_or_else(|| "none".into())
        ),
        format!("Foreign Title: {}", display_or_dash(&foreign_title)),
        format!("Year/Season/Album: {}", display_or_dash(&season_year)),
    ];

    let mut row = DeployRow {
        record_id: record.id.clone(),
        record_name: if name.is_empty() {
            "(no name)".into()
        } else {
            name.clone()
        },
        record_meta: season_year.clone(),
        content_type: content_type.clone(),
        route,
        match_keys: Vec::new(),
        matched_sheets: "-".into(),
        pac_row: None,
        thales_row: None,
        presence_row: None,
        status: DeployStatus::NoMatch,
        reason: String::new(),
        derived: DerivedFields::default(),
        updates: Vec::new(),
    };

    let Some(route) = route else {
        row.reason = "Unsupported content type for grid routing.".into();
        trace.push("Outcome: no_match (unsupported content type)".into());
        return finish(row, trace);
    };
    if content_type.is_empty() {
        row.content_type = route.to_string();
    }

    let pac_context = session.context(route.pac_sheet());
    let thales_context = session.context(route.thales_sheet());
    let presence_context = route.presence_sheet().and_then(|id| session.context(id));
    let (Some(pac_context), Some(thales_context)) = (pac_context, thales_context) else {
        row.reason = format!("Missing verified sheet config for route {route}.");
        trace.push(format!(
            "Outcome: no_match (missing verified sheet config for route {route})"
        ));
        return finish(row, trace);
    };

    // Candidate keys: each title fragment alone and, where a year/season
    // token exists, combined with it.
    let mut candidates: SmallVec<[String; 4]> = SmallVec::new();
    for fragment in [foreign_title.as_str(), name.as_str()] {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        let key = normalize_title(fragment);
        if !key.is_empty() && !candidates.contains(&key) {
            candidates.push(key);
        }
        if !season_year.is_empty() {
            let with_meta = normalize_title(&format!("{fragment} {season_year}"));
            if !with_meta.is_empty() && !candidates.contains(&with_meta) {
                candidates.push(with_meta);
            }
        }
    }
    trace.push(format!(
        "Search keys: {}",
        if candidates.is_empty() { "-".into() } else { candidates.join(" | ") }
    ));
    row.match_keys = candidates.to_vec();

    if candidates.is_empty() {
        row.reason = "No search keys from record title/year.".into();
        trace.push("Outcome: no_match (no search keys from record title/year)".into());
        return finish(row, trace);
    }

    let min_score = route.min_score();
    let allow_containment = route.allow_containment();
    trace.push(format!(
        "Threshold: {min_score} (containment {})",
        if allow_containment { "on" } else { "off" }
    ));

    let pac_sheet = route.pac_sheet();
    let thales_sheet = route.thales_sheet();
    let pac = match_in(pac_context, &candidates, min_score, allow_containment);
    let thales = match_in(thales_context, &candidates, min_score, allow_containment);
    let presence = presence_context
        .and_then(|context| match_in(context, &candidates, min_score, allow_containment));

    for (label, hit) in [
        (pac_sheet.to_string(), &pac),
        (thales_sheet.to_string(), &thales),
    ] {
        trace.push(match hit {
            Some(m) => format!("Best {label}: {} (score {}, row {})", m.key, m.score, m.row + 1),
            None => format!("Best {label}: none"),
        });
    }
    if let Some(presence_sheet) = route.presence_sheet() {
        trace.push(match &presence {
            Some(m) => format!(
                "Best {presence_sheet}: {} (score {}, row {})",
                m.key,
                m.score,
                m.row + 1
            ),
            None => format!("Best {presence_sheet}: none"),
        });
    }

    row.matched_sheets = format!("{pac_sheet} / {thales_sheet}");
    row.pac_row = pac.as_ref().map(|m| m.row + 1);
    row.thales_row = thales.as_ref().map(|m| m.row + 1);
    row.presence_row = presence.as_ref().map(|m| m.row + 1);

    if pac.is_none() && thales.is_none() && presence.is_none() {
        row.reason = "No Programme Grid row matched record title/year.".into();
        trace.push("Outcome: no_match (no grid rows matched keys)".into());
        return finish(row, trace);
    }

    // Derivation. Cycle: first parseable start date, PAC then Thales then
    // presence. Expiry: the earliest end date governs across all matches.
    let ordered = [&pac, &thales, &presence];
    row.derived.cycle_added = ordered
        .iter()
        .filter_map(|m| m.as_ref())
        .find_map(|m| m.cycle_date())
        .map(cycle_code);
    row.derived.cycle_expiring = ordered
        .iter()
        .filter_map(|m| m.as_ref())
        .filter_map(|m| m.expiry_date())
        .min()
        .map(cycle_code);
    trace.push(format!(
        "Cycle source raw: PAC={} | Thales={} | Presence={}",
        pac.as_ref().map(|m| m.cycle_cell_text()).as_deref().map(display_or_dash).unwrap_or("-"),
        thales.as_ref().map(|m| m.cycle_cell_text()).as_deref().map(display_or_dash).unwrap_or("-"),
        presence.as_ref().map(|m| m.cycle_cell_text()).as_deref().map(display_or_dash).unwrap_or("-"),
    ));
    trace.push(format!(
        "Cycle computed: {}",
        row.derived.cycle_added.as_deref().unwrap_or("-")
    ));
    trace.push(format!(
        "Cycle Expiring raw dates: PAC={} | Thales={} | Presence={}",
        pac.as_ref().and_then(|m| m.expiry_date()).map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        thales.as_ref().and_then(|m| m.expiry_date()).map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        presence.as_ref().and_then(|m| m.expiry_date()).map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
    ));
    trace.push(format!(
        "Cycle Expiring computed: {}",
        row.derived.cycle_expiring.as_deref().unwrap_or("-")
    ));

    let mut system_trace: Vec<String> = Vec::new();
    if let Some(pac) = &pac {
        for (flag, idx) in pac.context.config.system_indices() {
            let Some(idx) = idx else { continue };
            let raw = pac.context.grid.cell_text(pac.row, idx);
            let available = !raw.is_empty();
            system_trace.push(format!("PAC {flag}: raw=\"{raw}\" => {available}"));
            match flag {
                SystemFlag::Ex3 => row.derived.ex3 = Some(available),
                SystemFlag::Ex2 => row.derived.ex2 = Some(available),
                SystemFlag::L3 => row.derived.l3 = Some(available),
                SystemFlag::Thales => {}
            }
        }
    }
    if presence.is_some() {
        row.derived.l3 = Some(true);
        system_trace.push("Presence sheet matched => L3 = true".into());
    }
    if thales.is_some() {
        row.derived.thales = Some(true);
        system_trace.push("Thales row matched => Thales = true".into());
    }
    if !system_trace.is_empty() {
        trace.push(format!("System checks: {}", system_trace.join(" | ")));
    }

    let mut pac_categories = pac.as_ref().map(|m| m.categories()).unwrap_or_default();
    for label in presence.as_ref().map(|m| m.categories()).unwrap_or_default() {
        if !pac_categories.contains(&label) {
            pac_categories.push(label);
        }
    }
    row.derived.pac_categories = pac_categories;
    row.derived.thales_categories = thales.as_ref().map(|m| m.categories()).unwrap_or_default();
    trace.push(format!(
        "PAC categories: {}",
        display_or_dash(&row.derived.pac_categories.join(", "))
    ));
    trace.push(format!(
        "Thales categories: {}",
        display_or_dash(&row.derived.thales_categories.join(", "))
    ));

    let source = {
        let fmt = |m: &Option<SheetMatch<'_>>| {
            m.as_ref().map(|m| (m.row + 1).to_string()).unwrap_or_else(|| "-".into())
        };
        let mut tag = format!("{pac_sheet}:{} | {thales_sheet}:{}", fmt(&pac), fmt(&thales));
        if let Some(presence_sheet) = route.presence_sheet() {
            tag.push_str(&format!(" | {presence_sheet}:{}", fmt(&presence)));
        }
        tag
    };

    // Diffing: propose a write only when the derived value genuinely differs
    // from the record's current value. Empty free text never overwrites.
    if row.derived.has_any() {
        let derived = row.derived.clone();
        let mut push_text = |column_id: &str, new_value: String| {
            push_if_changed(
                &mut row.updates,
                board,
                record,
                column_id,
                WriteValue::Text { text: new_value },
                &source,
            );
        };
        push_text(&columns.cycle, derived.cycle_added.clone().unwrap_or_default());
        push_text(expiry_target, derived.cycle_expiring.clone().unwrap_or_default());
        push_text(&columns.cat_pac, derived.pac_categories.join(", "));
        push_text(&columns.cat_thales, derived.thales_categories.join(", "));

        let flag_targets = [
            (&columns.flag_ex3, derived.ex3),
            (&columns.flag_ex2, derived.ex2),
            (&columns.flag_l3, derived.l3),
            (&columns.flag_thales, derived.thales),
        ];
        for (column_id, value) in flag_targets {
            if let Some(checked) = value {
                push_if_changed(
                    &mut row.updates,
                    board,
                    record,
                    column_id,
                    WriteValue::Checkbox { checked },
                    &source,
                );
            }
        }
    }

    if row.updates.is_empty() {
        trace.push("Planned updates: none".into());
        row.status = DeployStatus::NoChanges;
        row.reason = if row.derived.has_any() {
            "Matched row found, but all target values already match.".into()
        } else {
            "Matched row, but no mapped output values were produced.".into()
        };
    } else {
        trace.push("Planned updates:".into());
        for update in &row.updates {
            trace.push(format!(
                "- {} [{}]: current=\"{}\" -> new=\"{}\"",
                update.column_title,
                update.column_id,
                display_or_dash(&update.current_value),
                display_or_dash(&update.new_value),
            ));
        }
        row.status = DeployStatus::Ready;
        row.reason = format!("{} field(s) will update.", row.updates.len());
    }
    trace.push(format!("Final status: {}", row.status));
    finish(row, trace)
}

fn finish(row: DeployRow, trace: Vec<String>) -> (DeployRow, String) {
    (row, trace.join("\n"))
}

fn match_in<'a>(
    context: SheetContext<'a>,
    candidates: &[String],
    min_score: u32,
    allow_containment: bool,
) -> Option<SheetMatch<'a>> {
    let hit = crate::matcher::best_match(candidates, &context.index, min_score, allow_containment)?;
    Some(SheetMatch {
        context,
        row: hit.row,
        key: hit.key,
        score: hit.score,
    })
}

fn push_if_changed(
    updates: &mut Vec<DeployUpdate>,
    board: &Board,
    record: &BoardRecord,
    column_id: &str,
    value: WriteValue,
    source: &str,
) {
    let Some(meta) = board.column_meta(column_id) else {
        return;
    };
    let (new_value, current_value) = match &value {
        WriteValue::Text { text } => {
            if text.is_empty() {
                return;
            }
            (text.clone(), record.column_text(column_id))
        }
        WriteValue::Checkbox { checked } => (
            checked.to_string(),
            bool_to_cell(record.checkbox_state(column_id)),
        ),
    };
    if new_value == current_value {
        return;
    }
    updates.push(DeployUpdate {
        column_id: column_id.to_string(),
        column_title: meta.title.clone(),
        current_value,
        new_value,
        source: source.to_string(),
        write: ColumnWrite {
            column_id: column_id.to_string(),
            value,
        },
    });
}
