//! Spreadsheet reading: workbook or CSV bytes into a raw cell grid.
//!
//! No header row is assumed here. Rows keep their original positions so the
//! header locator can report indexes relative to the sheet.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Empty cells and whitespace-only text carry no value.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheetGrid {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheetGrid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_blank))
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Workbook,
    Csv,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            "csv" | "txt" => Some(Self::Csv),
            _ => None,
        }
    }
}

pub fn read_grid_from_path(path: &Path) -> Result<RawSheetGrid, ParseError> {
    let format = SheetFormat::from_path(path)
        .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    read_grid(&bytes, format)
}

pub fn read_grid(bytes: &[u8], format: SheetFormat) -> Result<RawSheetGrid, ParseError> {
    match format {
        SheetFormat::Workbook => read_workbook_grid(bytes),
        SheetFormat::Csv => read_csv_grid(bytes),
    }
}

/// Reads the first sheet of a workbook.
pub fn read_workbook_grid(bytes: &[u8]) -> Result<RawSheetGrid, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ParseError::Workbook(e.to_string()))?;
    let sheet_names = workbook.sheet_names();
    let Some(first) = sheet_names.first() else {
        return Err(ParseError::EmptyWorkbook);
    };
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| ParseError::Workbook(format!("read sheet {first}: {e}")))?;

    // calamine ranges start at the first used cell; pad back to A1 so row
    // indexes match what a user sees in the sheet.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }
    Ok(RawSheetGrid::new(rows))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        // Date-formatted cells keep their serial value; date derivation
        // happens at upload time.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// CSV cells that parse as plain numbers become numeric cells, matching how
/// a workbook reader would type them.
pub fn read_csv_grid(bytes: &[u8]) -> Result<RawSheetGrid, ParseError> {
    let text = decode_csv_text(bytes);
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(csv_cell).collect());
    }
    Ok(RawSheetGrid::new(rows))
}

/// UTF-8 when the bytes are valid UTF-8, otherwise Windows-1252 (what Danish
/// Excel writes for "CSV (semikolonsepareret)").
fn decode_csv_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            log::debug!("csv is not utf-8; decoding as windows-1252");
            encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
        }
    }
}

fn csv_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Empty;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

// Danish exports commonly use ';' because ',' is the decimal separator.
fn sniff_delimiter(text: &str) -> u8 {
    let (semicolons, commas) = text
        .lines()
        .take(crate::header_locate::HEADER_SCAN_ROWS)
        .fold((0usize, 0usize), |(s, c), line| {
            (s + line.matches(';').count(), c + line.matches(',').count())
        });
    if semicolons > commas { b';' } else { b',' }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_numbers_are_typed() {
        let grid = read_csv_grid(b"Navn,Mal\nJonas,2\n,\n").unwrap();
        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[1][0], CellValue::text("Jonas"));
        assert_eq!(grid.rows[1][1], CellValue::Number(2.0));
        assert_eq!(grid.rows[2][0], CellValue::Empty);
    }

    #[test]
    fn csv_semicolon_delimiter_is_detected() {
        let grid = read_csv_grid("navn;øvelse;1.pr\nAnna;Squat;80\n".as_bytes()).unwrap();
        assert_eq!(grid.rows[0].len(), 3);
        assert_eq!(grid.rows[1][2], CellValue::Number(80.0));
    }

    #[test]
    fn windows_1252_csv_keeps_danish_letters() {
        let bytes = b"Tidsstempel;Navn (fulde navn);M\xE5l;R\xF8de kort\n44927;Jonas;2;0\n";
        let grid = read_csv_grid(bytes).unwrap();
        assert_eq!(grid.rows[0][2], CellValue::text("Mål"));
        assert_eq!(grid.rows[0][3], CellValue::text("Røde kort"));
        assert_eq!(grid.rows[1][2], CellValue::Number(2.0));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let grid = read_csv_grid("\u{feff}Navn;Øvelse\nAnna;Squat\n".as_bytes()).unwrap();
        assert_eq!(grid.rows[0][0], CellValue::text("Navn"));
        assert_eq!(grid.rows[0][1], CellValue::text("Øvelse"));
    }

    #[test]
    fn blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
        assert!(RawSheetGrid::new(vec![vec![CellValue::Empty]]).is_empty());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            SheetFormat::from_path(Path::new("stats.XLSX")),
            Some(SheetFormat::Workbook)
        );
        assert_eq!(
            SheetFormat::from_path(Path::new("gym.csv")),
            Some(SheetFormat::Csv)
        );
        assert_eq!(SheetFormat::from_path(Path::new("notes.pdf")), None);
    }
}
