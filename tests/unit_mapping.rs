use grid_reconcile::overrides::SheetOverride;
use grid_reconcile::sheets::mapping::{Provenance, resolve_columns, verify_report};
use grid_reconcile::sheets::{SheetId, SystemFlag};

mod support;
use support::builders::{grid, movies_pac_sheet, text_row};

#[test]
fn movie_headers_detect_title_year_and_system_columns() {
    let sheet = movies_pac_sheet(vec![]);
    let config = resolve_columns(SheetId::MoviesPac, "Movies_PAC", &sheet, 0, None);

    assert_eq!(config.title_cols[0].value, "B");
    assert_eq!(config.title_cols[1].value, "C");
    assert_eq!(config.title_cols[0].source, Provenance::Detected);

    let systems: Vec<(SystemFlag, Option<String>)> = config
        .systems
        .iter()
        .map(|(flag, col)| (*flag, col.value.clone()))
        .collect();
    assert!(systems.contains(&(SystemFlag::Ex3, Some("F".into()))));
    assert!(systems.contains(&(SystemFlag::Ex2, Some("G".into()))));
    assert!(systems.contains(&(SystemFlag::L3, Some("H".into()))));

    assert_eq!(config.cycle_col.value, "D");
    assert_eq!(config.cycle_end_col.value, "E");
    assert_eq!(config.cycle_col.source, Provenance::Detected);

    // Categories span the columns between Subtitles and We Recommend.
    assert_eq!(config.category_start.value, "J");
    assert_eq!(config.category_end.value, "K");
}

#[test]
fn missing_headers_fall_back_to_static_defaults() {
    let sheet = grid(vec![text_row(&["Nothing", "Recognizable", "Here"])]);
    let config = resolve_columns(SheetId::MoviesPac, "Movies_PAC", &sheet, 0, None);

    assert_eq!(config.title_cols[0].value, "E");
    assert_eq!(config.title_cols[0].source, Provenance::Default);
    assert_eq!(config.cycle_col.value, "M");
    assert_eq!(config.cycle_col.source, Provenance::Default);
    assert_eq!(config.category_start.value, "S");
    assert_eq!(config.category_start.source, Provenance::Default);
}

#[test]
fn overrides_take_precedence_and_report_their_provenance() {
    let sheet = movies_pac_sheet(vec![]);
    let override_ = SheetOverride {
        header_row: Some(1),
        cycle: Some("Z".into()),
        cat_start: Some("AA".into()),
        systems: [(SystemFlag::Ex3, "AB".to_string())].into_iter().collect(),
        ..Default::default()
    };
    let config = resolve_columns(SheetId::MoviesPac, "Movies_PAC", &sheet, 0, Some(&override_));

    assert_eq!(config.header_row.value, 0);
    assert_eq!(config.header_row.source, Provenance::Override);
    assert_eq!(config.cycle_col.value, "Z");
    assert_eq!(config.cycle_col.source, Provenance::Override);
    assert_eq!(config.category_start.value, "AA");
    assert_eq!(config.category_start.source, Provenance::Override);
    // Untouched endpoint keeps its detected value.
    assert_eq!(config.category_end.source, Provenance::Detected);

    let ex3 = config
        .systems
        .iter()
        .find(|(flag, _)| *flag == SystemFlag::Ex3)
        .unwrap();
    assert_eq!(ex3.1.value.as_deref(), Some("AB"));
    assert_eq!(ex3.1.source, Provenance::Override);
}

#[test]
fn unparseable_system_override_falls_back_to_the_default_letter() {
    let sheet = grid(vec![text_row(&["Nothing"])]);
    let override_ = SheetOverride {
        systems: [(SystemFlag::Ex3, "?".to_string())].into_iter().collect(),
        ..Default::default()
    };
    let config = resolve_columns(SheetId::MoviesPac, "Movies_PAC", &sheet, 0, Some(&override_));
    let ex3 = config
        .systems
        .iter()
        .find(|(flag, _)| *flag == SystemFlag::Ex3)
        .unwrap();
    assert_eq!(ex3.1.value.as_deref(), Some("CU"));
    assert_eq!(ex3.1.source, Provenance::Default);
}

#[test]
fn audio_ex_sheet_uses_exact_system_headers_when_present() {
    let sheet = grid(vec![text_row(&["No.", "Artist", "Album", "EX3", "EX2"])]);
    let config = resolve_columns(SheetId::AudioExPac, "Audio eX-Series_PAC", &sheet, 0, None);
    let lookup = |flag: SystemFlag| {
        config
            .systems
            .iter()
            .find(|(f, _)| *f == flag)
            .and_then(|(_, col)| col.value.clone())
    };
    assert_eq!(lookup(SystemFlag::Ex3).as_deref(), Some("D"));
    assert_eq!(lookup(SystemFlag::Ex2).as_deref(), Some("E"));
}

#[test]
fn thales_movie_sheet_takes_the_end_column_for_its_flag() {
    let sheet = grid(vec![text_row(&["No.", "Title", "Year", "Start", "End"])]);
    let config = resolve_columns(SheetId::MoviesThales, "Movies_Thales", &sheet, 0, None);
    let thales = config
        .systems
        .iter()
        .find(|(flag, _)| *flag == SystemFlag::Thales)
        .unwrap();
    assert_eq!(thales.1.value.as_deref(), Some("E"));
    assert_eq!(thales.1.source, Provenance::Detected);
}

#[test]
fn world_sheets_pin_the_category_range() {
    let sheet = grid(vec![text_row(&["No.", "Artist", "Title"])]);
    let config = resolve_columns(SheetId::WorldPac, "Emirates World_PAC", &sheet, 0, None);
    assert_eq!(config.category_start.value, "H");
    assert_eq!(config.category_end.value, "H");
}

#[test]
fn audio_thales_label_row_is_pinned_below_the_header() {
    let sheet = grid(vec![
        text_row(&["Banner"]),
        vec![],
        vec![],
        vec![],
        text_row(&["", "Label Row"]),
        text_row(&["No.", "Artist", "Album", "Thales"]),
    ]);
    let override_ = SheetOverride {
        header_row: Some(6),
        ..Default::default()
    };
    let config = resolve_columns(SheetId::AudioThales, "Audio_Thales", &sheet, 0, Some(&override_));
    assert_eq!(config.header_row.value, 5);
    assert_eq!(config.category_label_row, 4);
}

#[test]
fn presence_only_sheet_shows_up_in_the_verify_report() {
    let sheet = grid(vec![text_row(&["No.", "Artist", "Album"])]);
    let config = resolve_columns(SheetId::AudioS3kiPac, "Audio S3Ki_PAC", &sheet, 0, None);
    let report = verify_report(&config, &sheet);

    assert_eq!(report.header_row, 1);
    let presence = report
        .details
        .iter()
        .find(|d| d.field == "System (L3)")
        .expect("presence detail");
    assert_eq!(presence.column, "-");
    assert_eq!(presence.header_value, "Presence-only");

    let overridden = report
        .details
        .iter()
        .find(|d| d.field == "Header row")
        .unwrap();
    assert!(overridden.note.contains("Detected"));
}
