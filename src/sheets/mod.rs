pub mod mapping;
pub mod resolve;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The fixed set of logical sheets a Programme Grid revision is expected to
/// carry. Actual tab names drift between revisions; resolution is fuzzy.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumIter,
)]
pub enum SheetId {
    #[serde(rename = "Movies_PAC")]
    #[strum(serialize = "Movies_PAC")]
    MoviesPac,
    #[serde(rename = "Movies_Thales")]
    #[strum(serialize = "Movies_Thales")]
    MoviesThales,
    #[serde(rename = "TV_PAC")]
    #[strum(serialize = "TV_PAC")]
    TvPac,
    #[serde(rename = "TV_Thales")]
    #[strum(serialize = "TV_Thales")]
    TvThales,
    #[serde(rename = "Audio eX-Series_PAC")]
    #[strum(serialize = "Audio eX-Series_PAC")]
    AudioExPac,
    #[serde(rename = "Audio_Thales")]
    #[strum(serialize = "Audio_Thales")]
    AudioThales,
    #[serde(rename = "Audio S3Ki_PAC")]
    #[strum(serialize = "Audio S3Ki_PAC")]
    AudioS3kiPac,
    #[serde(rename = "Emirates World_PAC")]
    #[strum(serialize = "Emirates World_PAC")]
    WorldPac,
    #[serde(rename = "Emirates World_Thales")]
    #[strum(serialize = "Emirates World_Thales")]
    WorldThales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Movies,
    Tv,
    Audio,
    World,
}

/// Availability systems tracked on the board. `Thales` doubles as the flag
/// implied by any Thales-sheet match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumIter,
)]
pub enum SystemFlag {
    #[serde(rename = "EX3")]
    #[strum(serialize = "EX3")]
    Ex3,
    #[serde(rename = "EX2")]
    #[strum(serialize = "EX2")]
    Ex2,
    #[serde(rename = "L3")]
    #[strum(serialize = "L3")]
    L3,
    #[serde(rename = "Thales")]
    #[strum(serialize = "Thales")]
    Thales,
}

/// Static defaults for one logical sheet. Overrides and header detection
/// refine these; they are never replaced wholesale.
#[derive(Debug, Clone, Copy)]
pub struct SheetSpec {
    pub id: SheetId,
    pub category: Category,
    /// Default letters for the two title-key columns.
    pub title_cols: [&'static str; 2],
    /// Default system availability columns. Empty for presence-only sheets.
    pub system_cols: &'static [(SystemFlag, &'static str)],
    /// Set when a title match alone implies one system's availability.
    pub presence_flag: Option<SystemFlag>,
    pub cycle_col: &'static str,
    pub cycle_end_col: &'static str,
    pub category_range: (&'static str, &'static str),
    /// Some revisions keep category labels on a fixed row above the data
    /// header; absolute 0-based row index when that applies.
    pub category_label_row: Option<usize>,
    /// Index rows under a swapped title-column alias as well (artist/title
    /// order is inconsistent in the world sheets).
    pub alias_swapped_titles: bool,
}

impl SheetId {
    pub fn spec(self) -> &'static SheetSpec {
        match self {
            SheetId::MoviesPac => &MOVIES_PAC,
            SheetId::MoviesThales => &MOVIES_THALES,
            SheetId::TvPac => &TV_PAC,
            SheetId::TvThales => &TV_THALES,
            SheetId::AudioExPac => &AUDIO_EX_PAC,
            SheetId::AudioThales => &AUDIO_THALES,
            SheetId::AudioS3kiPac => &AUDIO_S3KI_PAC,
            SheetId::WorldPac => &WORLD_PAC,
            SheetId::WorldThales => &WORLD_THALES,
        }
    }

    pub fn category(self) -> Category {
        self.spec().category
    }

    pub fn is_thales(self) -> bool {
        matches!(
            self,
            SheetId::MoviesThales
                | SheetId::TvThales
                | SheetId::AudioThales
                | SheetId::WorldThales
        )
    }
}

static MOVIES_PAC: SheetSpec = SheetSpec {
    id: SheetId::MoviesPac,
    category: Category::Movies,
    title_cols: ["E", "I"],
    system_cols: &[
        (SystemFlag::Ex3, "CU"),
        (SystemFlag::Ex2, "CW"),
        (SystemFlag::L3, "CY"),
    ],
    presence_flag: None,
    cycle_col: "M",
    cycle_end_col: "N",
    category_range: ("S", "CM"),
    category_label_row: None,
    alias_swapped_titles: false,
};

static MOVIES_THALES: SheetSpec = SheetSpec {
    id: SheetId::MoviesThales,
    category: Category::Movies,
    title_cols: ["E", "I"],
    system_cols: &[(SystemFlag::Thales, "N")],
    presence_flag: None,
    cycle_col: "M",
    cycle_end_col: "N",
    category_range: ("S", "GK"),
    category_label_row: None,
    alias_swapped_titles: false,
};

static TV_PAC: SheetSpec = SheetSpec {
    id: SheetId::TvPac,
    category: Category::Tv,
    title_cols: ["E", "G"],
    system_cols: &[
        (SystemFlag::Ex3, "BL"),
        (SystemFlag::Ex2, "BN"),
        (SystemFlag::L3, "BR"),
    ],
    presence_flag: None,
    cycle_col: "P",
    cycle_end_col: "Q",
    category_range: ("T", "BJ"),
    category_label_row: None,
    alias_swapped_titles: false,
};

static TV_THALES: SheetSpec = SheetSpec {
    id: SheetId::TvThales,
    category: Category::Tv,
    title_cols: ["E", "G"],
    system_cols: &[(SystemFlag::Thales, "S")],
    presence_flag: None,
    cycle_col: "R",
    cycle_end_col: "S",
    category_range: ("Y", "DK"),
    category_label_row: Some(3),
    alias_swapped_titles: false,
};

static AUDIO_EX_PAC: SheetSpec = SheetSpec {
    id: SheetId::AudioExPac,
    category: Category::Audio,
    title_cols: ["F", "G"],
    system_cols: &[(SystemFlag::Ex3, "CB"), (SystemFlag::Ex2, "CC")],
    presence_flag: None,
    cycle_col: "D",
    cycle_end_col: "E",
    category_range: ("P", "CA"),
    category_label_row: None,
    alias_swapped_titles: false,
};

static AUDIO_THALES: SheetSpec = SheetSpec {
    id: SheetId::AudioThales,
    category: Category::Audio,
    title_cols: ["E", "F"],
    system_cols: &[(SystemFlag::Thales, "D")],
    presence_flag: None,
    cycle_col: "C",
    cycle_end_col: "D",
    category_range: ("AJ", "DQ"),
    category_label_row: Some(4),
    alias_swapped_titles: false,
};

static AUDIO_S3KI_PAC: SheetSpec = SheetSpec {
    id: SheetId::AudioS3kiPac,
    category: Category::Audio,
    title_cols: ["F", "G"],
    system_cols: &[],
    presence_flag: Some(SystemFlag::L3),
    cycle_col: "D",
    cycle_end_col: "E",
    category_range: ("P", "CA"),
    category_label_row: None,
    alias_swapped_titles: false,
};

static WORLD_PAC: SheetSpec = SheetSpec {
    id: SheetId::WorldPac,
    category: Category::World,
    title_cols: ["D", "E"],
    system_cols: &[
        (SystemFlag::Ex3, "K"),
        (SystemFlag::Ex2, "L"),
        (SystemFlag::L3, "N"),
    ],
    presence_flag: None,
    cycle_col: "C",
    cycle_end_col: "D",
    category_range: ("F", "I"),
    category_label_row: None,
    alias_swapped_titles: true,
};

static WORLD_THALES: SheetSpec = SheetSpec {
    id: SheetId::WorldThales,
    category: Category::World,
    title_cols: ["D", "E"],
    system_cols: &[(SystemFlag::Thales, "C")],
    presence_flag: None,
    cycle_col: "C",
    cycle_end_col: "D",
    category_range: ("F", "I"),
    category_label_row: None,
    alias_swapped_titles: true,
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_sheet_has_defaults_and_a_stable_display_name() {
        for id in SheetId::iter() {
            let spec = id.spec();
            assert_eq!(spec.id, id);
            assert!(!spec.title_cols[0].is_empty());
            assert!(!spec.cycle_col.is_empty());
            assert!(id.to_string().contains(match spec.category {
                Category::Movies => "Movies",
                Category::Tv => "TV",
                Category::Audio => "Audio",
                Category::World => "World",
            }));
        }
    }

    #[test]
    fn presence_only_sheet_carries_no_system_columns() {
        let spec = SheetId::AudioS3kiPac.spec();
        assert!(spec.system_cols.is_empty());
        assert_eq!(spec.presence_flag, Some(SystemFlag::L3));
    }
}
