use std::path::PathBuf;

use rust_xlsxwriter::Workbook;

use squad_ingest::aliases::{AliasTables, MatchField, PerformanceField, RecordKind};
use squad_ingest::parser::{ParseError, parse_file, parse_grid};
use squad_ingest::sheet::{CellValue, RawSheetGrid};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn text_row(cells: &[&str]) -> Vec<CellValue> {
    cells.iter().map(|c| CellValue::from(*c)).collect()
}

#[test]
fn parses_semicolon_match_csv() {
    let parsed = parse_file(&fixture_path("match_semicolon.csv"), AliasTables::default())
        .expect("fixture should parse");
    assert_eq!(parsed.kind(), RecordKind::Match);
    assert_eq!(parsed.classification.header_index, 2);
    // Blank row skipped, nameless row dropped.
    assert_eq!(parsed.records.len(), 3);

    let first = &parsed.records[0];
    assert_eq!(first.player_name().as_deref(), Some("Jonas Madsen"));
    assert_eq!(
        first.match_field(MatchField::SuccessfulPasses),
        Some(&CellValue::Number(12.0))
    );
    assert_eq!(
        first.match_field(MatchField::Feedback).map(CellValue::as_text),
        Some("Flere afslutninger".to_string())
    );
    assert!(parsed.records[1].match_field(MatchField::Feedback).is_none());
}

#[test]
fn parses_comma_performance_csv() {
    let parsed = parse_file(&fixture_path("performance_comma.csv"), AliasTables::default())
        .expect("fixture should parse");
    assert_eq!(parsed.kind(), RecordKind::Performance);
    assert_eq!(parsed.classification.header_index, 0);
    assert_eq!(parsed.records.len(), 3);
    assert_eq!(
        parsed.records[0]
            .performance_field(PerformanceField::Pr1)
            .map(CellValue::as_text),
        Some("82,5 kg".to_string())
    );
}

#[test]
fn parses_xlsx_with_offset_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kamp.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Kampdata forår").unwrap();
    let header = [
        "Tidsstempel",
        "Modstanderen (hvem spillede du mod)",
        "Navn (fulde navn)",
        "Mål",
    ];
    for (col, h) in header.iter().enumerate() {
        sheet.write_string(3, col as u16 + 1, *h).unwrap();
    }
    sheet.write_number(4, 1, 44927.5).unwrap();
    sheet.write_string(4, 2, "B93").unwrap();
    sheet.write_string(4, 3, "Jonas").unwrap();
    sheet.write_number(4, 4, 2.0).unwrap();
    workbook.save(&path).unwrap();

    let parsed = parse_file(&path, AliasTables::default()).unwrap();
    assert_eq!(parsed.kind(), RecordKind::Match);
    assert_eq!(parsed.classification.header_index, 3);
    assert_eq!(parsed.records.len(), 1);
    assert_eq!(
        parsed.records[0].match_field(MatchField::Timestamp),
        Some(&CellValue::Number(44927.5))
    );
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = parse_file(&fixture_path("notes.pdf"), AliasTables::default()).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedFormat(_)));
}

#[test]
fn one_recognized_column_is_not_enough() {
    let grid = RawSheetGrid::new(vec![
        text_row(&["Navn (fulde navn)", "Hold", "Noter"]),
        text_row(&["Jonas", "U17", "ok"]),
    ]);
    let err = parse_grid(&grid, AliasTables::default()).unwrap_err();
    assert!(matches!(err, ParseError::UnknownFileType));
    assert_eq!(
        err.to_string(),
        "Could not identify file type. Please check column headers."
    );

    let grid = RawSheetGrid::new(vec![
        text_row(&["Navn (fulde navn)", "Mål", "Noter"]),
        text_row(&["Jonas", "1", "ok"]),
    ]);
    let parsed = parse_grid(&grid, AliasTables::default()).unwrap();
    assert_eq!(parsed.kind(), RecordKind::Match);
}

#[test]
fn header_spelling_variations_classify_the_same() {
    let variants: [&[&str]; 3] = [
        &["Navn (fulde navn)", "Modstanderen (hvem spillede du mod)", "Mål"],
        &["  NAVN (FULDE  NAVN) ", "modstanderen hvem spillede du mod", "MÅL "],
        &["navn - fulde navn", "Modstanderen: hvem spillede du mod?", "mål."],
    ];
    for header in variants {
        let grid = RawSheetGrid::new(vec![
            text_row(header),
            text_row(&["Jonas", "B93", "2"]),
        ]);
        let parsed = parse_grid(&grid, AliasTables::default()).unwrap();
        assert_eq!(parsed.kind(), RecordKind::Match, "header {header:?}");
        assert_eq!(parsed.classification.match_header.match_count, 3);
        assert_eq!(parsed.records[0].player_name().as_deref(), Some("Jonas"));
    }
}

#[test]
fn rows_without_player_are_dropped() {
    let grid = RawSheetGrid::new(vec![
        text_row(&["Navn", "Øvelse", "1.pr"]),
        text_row(&["Anna", "Squat", "80"]),
        text_row(&["   ", "Squat", "70"]),
        text_row(&["", "Dødløft", "120"]),
    ]);
    let parsed = parse_grid(&grid, AliasTables::default()).unwrap();
    assert_eq!(parsed.records.len(), 1);

    let grid = RawSheetGrid::new(vec![
        text_row(&["Navn", "Øvelse", "1.pr"]),
        text_row(&["", "Squat", "80"]),
    ]);
    let err = parse_grid(&grid, AliasTables::default()).unwrap_err();
    assert!(matches!(err, ParseError::NoValidRows));
}
