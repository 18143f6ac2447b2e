use crate::sheets::{SheetId, SystemFlag};
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Operator-supplied corrections for one sheet. Every field is optional and
/// independently clearable; unset fields fall back to detected or default
/// values during resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SheetOverride {
    /// 1-based header row number, as operators read it off the sheet.
    pub header_row: Option<u32>,
    pub title_1: Option<String>,
    pub title_2: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub systems: BTreeMap<SystemFlag, String>,
    pub cycle: Option<String>,
    pub cycle_expired: Option<String>,
    pub cat_start: Option<String>,
    pub cat_end: Option<String>,
}

/// Addressable override fields, for targeted clearing from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideField {
    HeaderRow,
    Title1,
    Title2,
    System(SystemFlag),
    Cycle,
    CycleExpired,
    CatStart,
    CatEnd,
}

impl SheetOverride {
    pub fn is_empty(&self) -> bool {
        *self == SheetOverride::default()
    }

    pub fn clear(&mut self, field: OverrideField) {
        match field {
            OverrideField::HeaderRow => self.header_row = None,
            OverrideField::Title1 => self.title_1 = None,
            OverrideField::Title2 => self.title_2 = None,
            OverrideField::System(flag) => {
                self.systems.remove(&flag);
            }
            OverrideField::Cycle => self.cycle = None,
            OverrideField::CycleExpired => self.cycle_expired = None,
            OverrideField::CatStart => self.cat_start = None,
            OverrideField::CatEnd => self.cat_end = None,
        }
    }
}

/// All overrides for one reconciliation session, keyed by logical sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct OverrideSet {
    sheets: BTreeMap<SheetId, SheetOverride>,
}

impl OverrideSet {
    pub fn get(&self, id: SheetId) -> Option<&SheetOverride> {
        self.sheets.get(&id)
    }

    pub fn set(&mut self, id: SheetId, override_: SheetOverride) {
        if override_.is_empty() {
            self.sheets.remove(&id);
        } else {
            self.sheets.insert(id, override_);
        }
    }

    pub fn clear_sheet(&mut self, id: SheetId) {
        self.sheets.remove(&id);
    }

    pub fn clear_field(&mut self, id: SheetId, field: OverrideField) {
        if let Some(entry) = self.sheets.get_mut(&id) {
            entry.clear(field);
            if entry.is_empty() {
                self.sheets.remove(&id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read override file '{}'", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid override file '{}'", path.display()))
    }
}
