use std::collections::HashSet;

use crate::aliases::AliasTable;
use crate::sheet::RawSheetGrid;
use crate::text_norm::normalize_cell;

/// Headers are expected within this many leading rows.
pub const HEADER_SCAN_ROWS: usize = 20;

/// A single coincidental hit is not trusted as a header row.
pub const MIN_HEADER_MATCHES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderMatch {
    pub index: Option<usize>,
    pub match_count: usize,
}

impl HeaderMatch {
    pub fn found(&self) -> bool {
        self.index.is_some()
    }
}

/// Finds the row within the scan window that names the most canonical fields
/// of `table`. Earlier rows win ties.
pub fn find_header_row(grid: &RawSheetGrid, table: &AliasTable) -> HeaderMatch {
    let mut best = HeaderMatch::default();
    for (index, row) in grid.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let count = count_matching_fields(row.iter().map(normalize_cell), table);
        if count > best.match_count && count >= MIN_HEADER_MATCHES {
            best = HeaderMatch {
                index: Some(index),
                match_count: count,
            };
        }
    }
    best
}

/// Number of distinct canonical fields with at least one variant present.
pub fn count_matching_fields(
    normalized_cells: impl Iterator<Item = String>,
    table: &AliasTable,
) -> usize {
    let cells: HashSet<String> = normalized_cells.filter(|c| !c.is_empty()).collect();
    table
        .entries()
        .iter()
        .filter(|entry| entry.keys().iter().any(|k| cells.contains(k)))
        .count()
}
