//! Spreadsheet → classified records.
//!
//! The pipeline is: read grid, locate a header row for each alias table,
//! classify, then map the rows under the winning header.

use std::path::Path;

use thiserror::Error;

use crate::aliases::{AliasTables, RecordKind};
use crate::classify::{Classification, classify};
use crate::row_mapper::{ClassifiedRecord, map_rows};
use crate::sheet::{RawSheetGrid, SheetFormat, read_grid, read_grid_from_path};

/// Failures surfaced to the user verbatim.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not identify file type. Please check column headers.")]
    UnknownFileType,

    #[error("No valid data rows found after parsing.")]
    NoValidRows,

    #[error("No valid data found in file. Please check the file format and column headers.")]
    EmptyWorkbook,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not read workbook: {0}")]
    Workbook(String),

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub classification: Classification,
    pub records: Vec<ClassifiedRecord>,
}

impl ParsedSheet {
    pub fn kind(&self) -> RecordKind {
        self.classification.kind
    }
}

pub fn parse_grid(grid: &RawSheetGrid, tables: AliasTables<'_>) -> Result<ParsedSheet, ParseError> {
    if grid.is_empty() {
        return Err(ParseError::EmptyWorkbook);
    }
    let classification = classify(grid, tables)?;
    let table = tables.for_kind(classification.kind);
    let records = map_rows(grid, classification.header_index, table)?;
    log::info!(
        "parsed {} {} record(s) from header row {}",
        records.len(),
        classification.kind,
        classification.header_index
    );
    Ok(ParsedSheet {
        classification,
        records,
    })
}

pub fn parse_bytes(
    bytes: &[u8],
    format: SheetFormat,
    tables: AliasTables<'_>,
) -> Result<ParsedSheet, ParseError> {
    let grid = read_grid(bytes, format)?;
    parse_grid(&grid, tables)
}

pub fn parse_file(path: &Path, tables: AliasTables<'_>) -> Result<ParsedSheet, ParseError> {
    let grid = read_grid_from_path(path)?;
    parse_grid(&grid, tables)
}
