use crate::grid::SheetGrid;
use crate::sheets::mapping::ResolvedSheetConfig;
use crate::text::normalize_title;
use ahash::RandomState;
use indexmap::IndexMap;

/// Per-sheet lookup from normalized title key to source row. Keys keep data
/// order; a later row with a colliding key takes over the entry (revisions
/// repeat carried-over titles, the freshest row governs), while swapped-order
/// alias keys never displace an existing entry.
#[derive(Debug, Default)]
pub struct RowIndex {
    entries: IndexMap<String, usize, RandomState>,
}

impl RowIndex {
    pub fn build(grid: &SheetGrid, config: &ResolvedSheetConfig) -> Self {
        let title_indices = config.title_indices();
        let spec = config.id.spec();
        let mut entries: IndexMap<String, usize, RandomState> = IndexMap::default();

        for r in (config.header_row.value + 1)..grid.rows.len() {
            let parts: Vec<String> = title_indices
                .iter()
                .map(|idx| grid.cell_text(r, *idx))
                .filter(|part| !part.is_empty())
                .collect();
            let key = normalize_title(&parts.join(" "));
            if key.is_empty() {
                continue;
            }
            entries.insert(key, r);

            if spec.alias_swapped_titles && title_indices.len() == 2 {
                let swapped: Vec<String> = [title_indices[1], title_indices[0]]
                    .iter()
                    .map(|idx| grid.cell_text(r, *idx))
                    .filter(|part| !part.is_empty())
                    .collect();
                let alias = normalize_title(&swapped.join(" "));
                if !alias.is_empty() && !entries.contains_key(&alias) {
                    entries.insert(alias, r);
                }
            }
        }

        Self { entries }
    }

    pub fn row_for(&self, key: &str) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
