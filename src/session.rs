use crate::board::Board;
use crate::config::EngineConfig;
use crate::errors::IngestError;
use crate::grid::{SheetGrid, Workbook};
use crate::index::RowIndex;
use crate::overrides::{OverrideField, OverrideSet, SheetOverride};
use crate::planner::Plan;
use crate::sheets::SheetId;
use crate::sheets::mapping::{HeaderVerifyReport, ResolvedSheetConfig, resolve_columns, verify_report};
use crate::sheets::resolve::{SheetResolution, resolve_sheets};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the planner needs to work one sheet: its resolved mapping, its
/// grid, and the title index (built lazily, cached for the session).
pub struct SheetContext<'a> {
    pub config: &'a ResolvedSheetConfig,
    pub grid: &'a SheetGrid,
    pub index: Arc<RowIndex>,
}

/// One reconciliation session: an ingested workbook plus the operator's
/// override layer, with sheet resolution and column mapping kept current as
/// overrides change. Explicit state; nothing here is ambient or global.
pub struct ReconcileSession {
    config: EngineConfig,
    workbook: Workbook,
    overrides: OverrideSet,
    resolutions: Vec<SheetResolution>,
    configs: AHashMap<SheetId, ResolvedSheetConfig>,
    indexes: Mutex<AHashMap<SheetId, Arc<RowIndex>>>,
}

impl ReconcileSession {
    pub fn new(
        config: EngineConfig,
        workbook: Workbook,
        overrides: OverrideSet,
    ) -> Result<Self, IngestError> {
        if workbook.is_empty() {
            return Err(IngestError::NoSheets);
        }
        if workbook
            .sheet_names()
            .iter()
            .all(|name| workbook.sheet(name).is_none_or(SheetGrid::is_empty))
        {
            return Err(IngestError::AllSheetsBlank);
        }

        let mut session = Self {
            config,
            workbook,
            overrides,
            resolutions: Vec::new(),
            configs: AHashMap::new(),
            indexes: Mutex::new(AHashMap::new()),
        };
        session.rebuild();
        Ok(session)
    }

    fn rebuild(&mut self) {
        self.resolutions = resolve_sheets(&self.workbook);
        self.configs.clear();
        self.indexes.lock().clear();

        for resolution in &self.resolutions {
            if !resolution.accepted {
                continue;
            }
            let Some(sheet_name) = resolution.matched.as_deref() else {
                continue;
            };
            let Some(grid) = self.workbook.sheet(sheet_name) else {
                continue;
            };
            if grid.is_empty() {
                continue;
            }
            let config = resolve_columns(
                resolution.id,
                sheet_name,
                grid,
                resolution.header_row,
                self.overrides.get(resolution.id),
            );
            self.configs.insert(resolution.id, config);
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn overrides(&self) -> &OverrideSet {
        &self.overrides
    }

    pub fn resolutions(&self) -> &[SheetResolution] {
        &self.resolutions
    }

    pub fn sheet_config(&self, id: SheetId) -> Option<&ResolvedSheetConfig> {
        self.configs.get(&id)
    }

    /// Working context for one sheet, if it resolved. The row index is built
    /// on first use and reused for the rest of the session.
    pub fn context(&self, id: SheetId) -> Option<SheetContext<'_>> {
        let config = self.configs.get(&id)?;
        let grid = self.workbook.sheet(&config.sheet_name)?;
        let index = {
            let mut cache = self.indexes.lock();
            cache
                .entry(id)
                .or_insert_with(|| Arc::new(RowIndex::build(grid, config)))
                .clone()
        };
        Some(SheetContext {
            config,
            grid,
            index,
        })
    }

    pub fn set_override(&mut self, id: SheetId, override_: SheetOverride) {
        self.overrides.set(id, override_);
        self.rebuild();
    }

    pub fn clear_override_field(&mut self, id: SheetId, field: OverrideField) {
        self.overrides.clear_field(id, field);
        self.rebuild();
    }

    pub fn clear_overrides(&mut self, id: SheetId) {
        self.overrides.clear_sheet(id);
        self.rebuild();
    }

    /// Header verification for every resolved sheet, in required-sheet order.
    pub fn verify_reports(&self) -> Vec<HeaderVerifyReport> {
        self.resolutions
            .iter()
            .filter_map(|resolution| {
                let config = self.configs.get(&resolution.id)?;
                let grid = self.workbook.sheet(&config.sheet_name)?;
                Some(verify_report(config, grid))
            })
            .collect()
    }

    pub fn plan(&self, board: &Board) -> Plan {
        crate::planner::build_plan(self, board)
    }
}
