use crate::aliases::{AliasTables, RecordKind};
use crate::header_locate::{HeaderMatch, find_header_row};
use crate::parser::ParseError;
use crate::sheet::RawSheetGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: RecordKind,
    pub header_index: usize,
    pub match_header: HeaderMatch,
    pub performance_header: HeaderMatch,
}

pub fn classify(grid: &RawSheetGrid, tables: AliasTables<'_>) -> Result<Classification, ParseError> {
    let match_header = find_header_row(grid, tables.matches);
    let performance_header = find_header_row(grid, tables.performance);
    let (kind, header_index) = decide(match_header, performance_header)?;
    log::debug!(
        "classified sheet as {kind} (header row {header_index}, match={}, performance={})",
        match_header.match_count,
        performance_header.match_count
    );
    Ok(Classification {
        kind,
        header_index,
        match_header,
        performance_header,
    })
}

/// Picks the record kind from the two locator results.
///
/// Equal counts resolve to `Match`.
pub fn decide(
    match_header: HeaderMatch,
    performance_header: HeaderMatch,
) -> Result<(RecordKind, usize), ParseError> {
    if let Some(index) = match_header.index
        && match_header.match_count > performance_header.match_count
    {
        return Ok((RecordKind::Match, index));
    }
    if let Some(index) = match_header.index
        && match_header.match_count == performance_header.match_count
    {
        return Ok((RecordKind::Match, index));
    }
    if let Some(index) = performance_header.index {
        return Ok((RecordKind::Performance, index));
    }
    if let Some(index) = match_header.index {
        return Ok((RecordKind::Match, index));
    }
    Err(ParseError::UnknownFileType)
}
