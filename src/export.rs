//! Workbook output: enriched player metrics, and blank upload templates whose
//! header rows the parser recognizes.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::aliases::AliasTable;
use crate::metrics::{EnrichedPlayerStat, PlayerSummary};

pub struct ExportReport {
    pub stat_rows: usize,
    pub players: usize,
}

enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Number(value as f64)
    }
}

pub fn export_metrics(
    path: &Path,
    enriched: &[EnrichedPlayerStat],
    summaries: &[PlayerSummary],
) -> Result<ExportReport> {
    let mut workbook = metrics_workbook(enriched, summaries)?;
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;
    Ok(ExportReport {
        stat_rows: enriched.len(),
        players: summaries.len(),
    })
}

pub fn metrics_workbook_bytes(
    enriched: &[EnrichedPlayerStat],
    summaries: &[PlayerSummary],
) -> Result<Vec<u8>> {
    let mut workbook = metrics_workbook(enriched, summaries)?;
    workbook.save_to_buffer().context("serialize metrics workbook")
}

fn metrics_workbook(
    enriched: &[EnrichedPlayerStat],
    summaries: &[PlayerSummary],
) -> Result<Workbook> {
    let mut stat_rows: Vec<Vec<Cell>> = vec![
        [
            "Player",
            "Match",
            "Goals",
            "Assists",
            "Passing Accuracy",
            "Defensive Action Ratio",
            "Offensive Contribution",
            "Defensive Contribution",
            "Shots per Pass",
            "Involvement",
            "Overall Impact",
            "Pressing Intensity",
            "Shooting Efficiency",
            "Ball Retention",
            "Defensive Workrate",
            "Rating",
        ]
        .into_iter()
        .map(Cell::from)
        .collect(),
    ];
    stat_rows.extend(enriched.iter().map(stat_row));

    let mut summary_rows: Vec<Vec<Cell>> = vec![
        [
            "Player",
            "Matches",
            "Goals",
            "Assists",
            "Avg Rating",
            "Avg Passing Accuracy",
        ]
        .into_iter()
        .map(Cell::from)
        .collect(),
    ];
    summary_rows.extend(summaries.iter().map(summary_row));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("PlayerStats")?;
        write_rows(sheet, &stat_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Players")?;
        write_rows(sheet, &summary_rows)?;
    }
    Ok(workbook)
}

fn stat_row(e: &EnrichedPlayerStat) -> Vec<Cell> {
    vec![
        e.player_name.clone().into(),
        e.match_label.clone().into(),
        e.goals.into(),
        e.assists.into(),
        e.passing_accuracy.into(),
        e.defensive_action_ratio.into(),
        e.offensive_contribution.into(),
        e.defensive_contribution.into(),
        e.shots_per_pass.into(),
        e.player_involvement.into(),
        e.overall_impact.into(),
        e.pressing_intensity.into(),
        e.shooting_efficiency.into(),
        e.ball_retention.into(),
        e.defensive_workrate.into(),
        e.performance_rating.into(),
    ]
}

fn summary_row(s: &PlayerSummary) -> Vec<Cell> {
    vec![
        s.player_name.clone().into(),
        s.matches.into(),
        s.goals.into(),
        s.assists.into(),
        s.avg_rating.into(),
        s.avg_passing_accuracy.into(),
    ]
}

/// A one-sheet workbook whose first row holds the first header variant of
/// every field in `table`.
pub fn template_workbook_bytes(table: &AliasTable) -> Result<Vec<u8>> {
    let header: Vec<Cell> = table
        .entries()
        .iter()
        .filter_map(|entry| entry.variants.first())
        .map(|v| Cell::Text(v.clone()))
        .collect();
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(table.kind().label())?;
        write_rows(sheet, &[header])?;
    }
    workbook.save_to_buffer().context("serialize template workbook")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            match value {
                Cell::Text(s) => worksheet.write_string(row_idx as u32, col_idx as u16, s),
                Cell::Number(n) => worksheet.write_number(row_idx as u32, col_idx as u16, *n),
            }
            .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
