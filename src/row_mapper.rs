use std::collections::BTreeMap;

use crate::aliases::{AliasTable, CanonicalField, MatchField, PerformanceField, RecordKind};
use crate::parser::ParseError;
use crate::sheet::{CellValue, RawSheetGrid};
use crate::text_norm::normalize_cell;

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub kind: RecordKind,
    pub fields: BTreeMap<CanonicalField, CellValue>,
}

impl ClassifiedRecord {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<CanonicalField>, value: impl Into<CellValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: impl Into<CanonicalField>) -> Option<&CellValue> {
        self.fields.get(&field.into())
    }

    pub fn match_field(&self, field: MatchField) -> Option<&CellValue> {
        self.get(field)
    }

    pub fn performance_field(&self, field: PerformanceField) -> Option<&CellValue> {
        self.get(field)
    }

    /// Trimmed player name, if any.
    pub fn player_name(&self) -> Option<String> {
        let value = self.get(CanonicalField::player(self.kind))?;
        let name = value.as_text().trim().to_string();
        if name.is_empty() { None } else { Some(name) }
    }
}

/// Maps every non-blank row below `header_index` onto the table's canonical
/// fields. Rows without a player identity are dropped.
pub fn map_rows(
    grid: &RawSheetGrid,
    header_index: usize,
    table: &AliasTable,
) -> Result<Vec<ClassifiedRecord>, ParseError> {
    let Some(header) = grid.row(header_index) else {
        return Err(ParseError::NoValidRows);
    };
    let columns = resolve_columns(header, table);

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in grid.rows.iter().skip(header_index + 1) {
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        let record = map_row(row, &columns, table.kind());
        if record.player_name().is_some() {
            records.push(record);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        log::debug!("dropped {dropped} row(s) without a player name");
    }
    if records.is_empty() {
        return Err(ParseError::NoValidRows);
    }
    Ok(records)
}

/// Column index → canonical field, from the sheet's own header cells.
fn resolve_columns(header: &[CellValue], table: &AliasTable) -> Vec<(usize, CanonicalField)> {
    header
        .iter()
        .enumerate()
        .filter_map(|(col, cell)| {
            table
                .field_for_key(&normalize_cell(cell))
                .map(|field| (col, field))
        })
        .collect()
}

fn map_row(
    row: &[CellValue],
    columns: &[(usize, CanonicalField)],
    kind: RecordKind,
) -> ClassifiedRecord {
    let mut record = ClassifiedRecord::new(kind);
    for (col, field) in columns {
        let Some(cell) = row.get(*col) else {
            continue;
        };
        if cell.is_blank() || record.fields.contains_key(field) {
            continue;
        }
        record.fields.insert(*field, cell.clone());
    }
    record
}
