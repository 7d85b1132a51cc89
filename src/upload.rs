//! Upload of classified records into a [`StatStore`].
//!
//! Match records are grouped into logical matches by (date, opponent), each
//! group gets a find-or-create match row and one batched stat upsert. Groups
//! are independent: a failing group is reported and the rest continue.
//! Performance records go through a single validated upsert.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aliases::{MatchField, PerformanceField, RecordKind};
use crate::config::IngestConfig;
use crate::row_mapper::ClassifiedRecord;
use crate::sheet::CellValue;
use crate::store::{DATE_FORMAT, NewMatch, PerformanceStat, PlayerMatchStat, StatStore};

pub const UNKNOWN_OPPONENT: &str = "Unknown Opponent";

/// Days between the spreadsheet epoch (1899-12-30) and 1970-01-01.
const SERIAL_UNIX_EPOCH_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H.%M.%S",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"];

#[derive(Debug, Clone)]
pub struct UploadContext {
    pub owner_id: String,
    pub default_team: String,
    /// Date used when a record's timestamp is missing or unreadable.
    pub today: NaiveDate,
}

impl UploadContext {
    pub fn from_config(cfg: &IngestConfig) -> Self {
        Self {
            owner_id: cfg.owner_id.clone(),
            default_team: cfg.default_team.clone(),
            today: Utc::now().date_naive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UploadDetails {
    pub matches_created: usize,
    pub matches_updated: usize,
    pub players_affected: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UploadResult {
    pub kind: Option<RecordKind>,
    pub success_count: usize,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<UploadDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Success,
    PartialSuccess,
    Failure,
}

impl UploadResult {
    pub fn outcome(&self) -> UploadOutcome {
        match (self.success_count, self.errors.is_empty()) {
            (_, true) => UploadOutcome::Success,
            (0, false) => UploadOutcome::Failure,
            (_, false) => UploadOutcome::PartialSuccess,
        }
    }
}

/// Running totals of the per-group upload fold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchResult {
    pub success_count: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub opponent: String,
}

#[derive(Debug, Clone)]
pub struct MatchGroup<'a> {
    pub key: MatchKey,
    pub team: String,
    pub records: Vec<&'a ClassifiedRecord>,
}

/// Dispatches on the first record's kind.
pub fn upload_records<S: StatStore>(
    store: &mut S,
    records: &[ClassifiedRecord],
    ctx: &UploadContext,
) -> UploadResult {
    let Some(first) = records.first() else {
        return UploadResult {
            errors: vec!["No data to upload".to_string()],
            ..Default::default()
        };
    };
    match first.kind {
        RecordKind::Match => upload_match_records(store, records, ctx),
        RecordKind::Performance => upload_performance_records(store, records, ctx),
    }
}

pub fn upload_match_records<S: StatStore>(
    store: &mut S,
    records: &[ClassifiedRecord],
    ctx: &UploadContext,
) -> UploadResult {
    let mut errors = Vec::new();
    let (matches, other_kind): (Vec<&ClassifiedRecord>, Vec<&ClassifiedRecord>) =
        records.iter().partition(|r| r.kind == RecordKind::Match);
    let (valid, nameless): (Vec<&ClassifiedRecord>, Vec<&ClassifiedRecord>) = matches
        .into_iter()
        .partition(|r| r.player_name().is_some());
    if !other_kind.is_empty() {
        errors.push(format!(
            "{} row(s) skipped: Not a match record",
            other_kind.len()
        ));
    }
    if !nameless.is_empty() {
        errors.push(format!(
            "{} row(s) skipped: Missing player name",
            nameless.len()
        ));
    }
    if valid.is_empty() {
        errors.push("No valid match data found to insert.".to_string());
        return UploadResult {
            kind: Some(RecordKind::Match),
            errors,
            ..Default::default()
        };
    }

    let groups = group_match_records(valid, ctx);
    log::info!("uploading {} match group(s)", groups.len());

    let (batch, details) = groups.iter().fold(
        (BatchResult::default(), UploadDetails::default()),
        |(mut batch, mut details), group| {
            match upload_group(store, group, ctx) {
                Ok(done) => {
                    batch.success_count += done.rows;
                    if done.created {
                        details.matches_created += 1;
                    } else {
                        details.matches_updated += 1;
                    }
                    for player in done.players {
                        if !details.players_affected.contains(&player) {
                            details.players_affected.push(player);
                        }
                    }
                }
                Err(failed) => {
                    // The match row stays even when its stats fail.
                    if failed.match_created {
                        details.matches_created += 1;
                    }
                    log::warn!("{}", failed.message);
                    batch.errors.push(failed.message);
                }
            }
            (batch, details)
        },
    );

    errors.extend(batch.errors);
    UploadResult {
        kind: Some(RecordKind::Match),
        success_count: batch.success_count,
        errors,
        details: Some(details),
    }
}

struct GroupDone {
    rows: usize,
    created: bool,
    players: Vec<String>,
}

struct GroupFailed {
    message: String,
    match_created: bool,
}

impl GroupFailed {
    fn new(message: String) -> Self {
        Self {
            message,
            match_created: false,
        }
    }
}

fn upload_group<S: StatStore>(
    store: &mut S,
    group: &MatchGroup<'_>,
    ctx: &UploadContext,
) -> Result<GroupDone, GroupFailed> {
    let opponent = &group.key.opponent;
    let date = group.key.date.format(DATE_FORMAT).to_string();

    let existing = store.find_match(group.key.date, opponent).map_err(|err| {
        GroupFailed::new(format!(
            "Failed to check match \"{opponent}\" ({date}): {err:#}"
        ))
    })?;
    let (match_id, created) = match existing {
        Some(id) => (id, false),
        None => {
            let id = store
                .insert_match(&NewMatch {
                    owner_id: ctx.owner_id.clone(),
                    date: group.key.date,
                    opponent: opponent.clone(),
                    team: group.team.clone(),
                })
                .map_err(|err| {
                    GroupFailed::new(format!(
                        "Failed to create match vs \"{opponent}\" ({date}): {err:#}"
                    ))
                })?;
            (id, true)
        }
    };

    let stats = collapse_repeated_players(
        group
            .records
            .iter()
            .filter_map(|r| build_player_stat(match_id, r)),
    );
    if stats.len() < group.records.len() {
        log::debug!(
            "match vs {opponent} ({date}): {} repeated player row(s) collapsed",
            group.records.len() - stats.len()
        );
    }
    store
        .upsert_player_stats(&stats)
        .map_err(|err| GroupFailed {
            message: format!(
                "Failed to save stats for match vs \"{opponent}\" ({date}): {err:#}"
            ),
            match_created: created,
        })?;

    log::debug!(
        "match {match_id} vs {opponent} ({date}): {} stat row(s), created={created}",
        stats.len()
    );
    Ok(GroupDone {
        rows: stats.len(),
        created,
        players: stats.into_iter().map(|s| s.player_name).collect(),
    })
}

/// One stat per player; a later row for the same player replaces the
/// earlier one in place.
fn collapse_repeated_players(
    stats: impl IntoIterator<Item = PlayerMatchStat>,
) -> Vec<PlayerMatchStat> {
    let mut out: Vec<PlayerMatchStat> = Vec::new();
    for stat in stats {
        match out.iter_mut().find(|s| s.player_name == stat.player_name) {
            Some(slot) => *slot = stat,
            None => out.push(stat),
        }
    }
    out
}

/// Groups records by (derived date, opponent), keeping first-seen order.
pub fn group_match_records<'a>(
    records: impl IntoIterator<Item = &'a ClassifiedRecord>,
    ctx: &UploadContext,
) -> Vec<MatchGroup<'a>> {
    let mut groups: Vec<MatchGroup<'a>> = Vec::new();
    let mut index: HashMap<MatchKey, usize> = HashMap::new();
    for record in records {
        let key = match_key(record, ctx.today);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(MatchGroup {
                key,
                team: text_or(record.match_field(MatchField::Team), &ctx.default_team),
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record);
    }
    groups
}

pub fn match_key(record: &ClassifiedRecord, today: NaiveDate) -> MatchKey {
    MatchKey {
        date: derive_match_date(record.match_field(MatchField::Timestamp), today),
        opponent: text_or(record.match_field(MatchField::Opponent), UNKNOWN_OPPONENT),
    }
}

fn text_or(cell: Option<&CellValue>, fallback: &str) -> String {
    let text = cell.map(|c| c.as_text().trim().to_string()).unwrap_or_default();
    if text.is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

pub fn build_player_stat(match_id: i64, record: &ClassifiedRecord) -> Option<PlayerMatchStat> {
    let count = |field: MatchField| coerce_count(record.match_field(field));
    Some(PlayerMatchStat {
        match_id,
        player_name: record.player_name()?,
        successful_passes: count(MatchField::SuccessfulPasses),
        total_passes: count(MatchField::TotalPasses),
        total_shots: count(MatchField::TotalShots),
        tackles_own_half: count(MatchField::TacklesOwnHalf),
        tackles_opp_half: count(MatchField::TacklesOpponentHalf),
        total_tackles: count(MatchField::TotalTackles),
        goals: count(MatchField::Goals),
        assists: count(MatchField::Assists),
        minutes_played: count(MatchField::Minutes),
        yellow_cards: count(MatchField::YellowCards),
        red_cards: count(MatchField::RedCards),
        feedback: record
            .match_field(MatchField::Feedback)
            .map(CellValue::as_text)
            .unwrap_or_default(),
    })
}

pub fn upload_performance_records<S: StatStore>(
    store: &mut S,
    records: &[ClassifiedRecord],
    ctx: &UploadContext,
) -> UploadResult {
    let mut errors = Vec::new();
    let mut valid = Vec::new();
    let mut skipped: BTreeMap<&'static str, usize> = BTreeMap::new();

    for record in records {
        let Some(player_name) = record.player_name() else {
            *skipped.entry("Missing player name").or_default() += 1;
            continue;
        };
        let exercise = record
            .performance_field(PerformanceField::Exercise)
            .map(|c| c.as_text().trim().to_string())
            .unwrap_or_default();
        if exercise.is_empty() {
            *skipped.entry("Missing exercise name").or_default() += 1;
            continue;
        }
        valid.push(PerformanceStat {
            owner_id: ctx.owner_id.clone(),
            player_name,
            exercise,
            pr_1: coerce_numeric_or_none(record.performance_field(PerformanceField::Pr1)),
            pr_2: coerce_numeric_or_none(record.performance_field(PerformanceField::Pr2)),
            pr_3: coerce_numeric_or_none(record.performance_field(PerformanceField::Pr3)),
            pr_4: coerce_numeric_or_none(record.performance_field(PerformanceField::Pr4)),
        });
    }

    for (reason, count) in skipped {
        errors.push(format!("{count} row(s) skipped: {reason}"));
    }
    if valid.is_empty() {
        errors.push("No valid performance data found to insert.".to_string());
        return UploadResult {
            kind: Some(RecordKind::Performance),
            errors,
            ..Default::default()
        };
    }

    let success_count = match store.upsert_performance_stats(&valid) {
        Ok(n) => n,
        Err(err) => {
            log::warn!("performance upload failed: {err:#}");
            errors.push(format!("Database error: {err:#}"));
            0
        }
    };
    UploadResult {
        kind: Some(RecordKind::Performance),
        success_count,
        errors,
        details: None,
    }
}

/// Calendar date for a timestamp cell: numbers are spreadsheet serial dates,
/// text is parsed, anything else (or anything unreadable) is `today`.
pub fn derive_match_date(cell: Option<&CellValue>, today: NaiveDate) -> NaiveDate {
    let parsed = match cell {
        Some(CellValue::Number(serial)) => serial_to_date(*serial),
        Some(CellValue::Text(text)) => parse_date_text(text),
        Some(CellValue::Empty) | None => None,
    };
    parsed.unwrap_or(today)
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let ms = ((serial - SERIAL_UNIX_EPOCH_DAYS) * MS_PER_DAY).round();
    if ms.abs() > 8.64e15 {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(ms as i64).map(|dt| dt.date_naive())
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Some(d);
        }
    }
    // Form exports append things like "12:01:33 PM GMT+1"; the leading token
    // is still a date.
    let head = text.split_whitespace().next()?;
    if head == text {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(head, fmt).ok())
}

/// Lenient numeric read: the whole trimmed cell must be a number. Missing,
/// blank, non-numeric, and non-finite values are all 0.
pub fn coerce_numeric_or_zero(cell: Option<&CellValue>) -> f64 {
    let value = match cell {
        Some(CellValue::Number(n)) => *n,
        Some(CellValue::Text(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        Some(CellValue::Empty) | None => 0.0,
    };
    if value.is_finite() { value } else { 0.0 }
}

pub fn coerce_count(cell: Option<&CellValue>) -> i64 {
    coerce_numeric_or_zero(cell).round() as i64
}

/// Reads a leading number ("82,5 kg" → 82.5). Zero and non-numeric cells
/// are `None`.
pub fn coerce_numeric_or_none(cell: Option<&CellValue>) -> Option<f64> {
    let value = match cell? {
        CellValue::Number(n) => *n,
        CellValue::Text(text) => leading_number(text)?,
        CellValue::Empty => return None,
    };
    if value.is_finite() && value != 0.0 {
        Some(value)
    } else {
        None
    }
}

fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let mut out = String::new();
    let mut seen_digit = false;
    let mut seen_sep = false;
    for (i, ch) in text.char_indices() {
        match ch {
            '+' | '-' if i == 0 => out.push(ch),
            '0'..='9' => {
                seen_digit = true;
                out.push(ch);
            }
            '.' | ',' if !seen_sep => {
                seen_sep = true;
                out.push('.');
            }
            _ => break,
        }
    }
    if !seen_digit {
        return None;
    }
    out.trim_end_matches('.').parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn serial_dates_convert_exactly() {
        assert_eq!(serial_to_date(44927.0), Some(ymd(2023, 1, 1)));
        assert_eq!(serial_to_date(44927.75), Some(ymd(2023, 1, 1)));
        assert_eq!(serial_to_date(25569.0), Some(ymd(1970, 1, 1)));
        assert_eq!(serial_to_date(f64::NAN), None);
    }

    #[test]
    fn text_dates_parse() {
        assert_eq!(parse_date_text("2023-01-01"), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date_text("2023-01-01T18:30:00Z"), Some(ymd(2023, 1, 1)));
        assert_eq!(parse_date_text("14/03/2024 19:02:11"), Some(ymd(2024, 3, 14)));
        assert_eq!(parse_date_text("14.03.2024"), Some(ymd(2024, 3, 14)));
        assert_eq!(
            parse_date_text("2024/03/14 7:02:11 PM GMT+1"),
            Some(ymd(2024, 3, 14))
        );
        assert_eq!(parse_date_text("sidste lørdag"), None);
    }

    #[test]
    fn unreadable_dates_fall_back_to_today() {
        let today = ymd(2026, 10, 18);
        assert_eq!(derive_match_date(None, today), today);
        assert_eq!(derive_match_date(Some(&CellValue::Empty), today), today);
        assert_eq!(
            derive_match_date(Some(&CellValue::text("ikke en dato")), today),
            today
        );
        assert_eq!(
            derive_match_date(Some(&CellValue::Number(44927.0)), today),
            ymd(2023, 1, 1)
        );
    }

    #[test]
    fn numeric_coercion_defaults_to_zero() {
        assert_eq!(coerce_numeric_or_zero(None), 0.0);
        assert_eq!(coerce_numeric_or_zero(Some(&CellValue::text(" 12 "))), 12.0);
        assert_eq!(coerce_numeric_or_zero(Some(&CellValue::text("12 stk"))), 0.0);
        assert_eq!(coerce_numeric_or_zero(Some(&CellValue::text("inf"))), 0.0);
        assert_eq!(coerce_numeric_or_zero(Some(&CellValue::Number(3.0))), 3.0);
        assert_eq!(coerce_count(Some(&CellValue::Number(2.6))), 3);
    }

    #[test]
    fn pr_coercion_reads_leading_number() {
        assert_eq!(coerce_numeric_or_none(Some(&CellValue::text("82,5 kg"))), Some(82.5));
        assert_eq!(coerce_numeric_or_none(Some(&CellValue::text("100"))), Some(100.0));
        assert_eq!(coerce_numeric_or_none(Some(&CellValue::text("0"))), None);
        assert_eq!(coerce_numeric_or_none(Some(&CellValue::text("kg"))), None);
        assert_eq!(coerce_numeric_or_none(Some(&CellValue::Number(55.0))), Some(55.0));
        assert_eq!(coerce_numeric_or_none(None), None);
    }

    #[test]
    fn grouping_is_exact_on_opponent() {
        let ctx = UploadContext {
            owner_id: "local".to_string(),
            default_team: "My Team".to_string(),
            today: ymd(2026, 10, 18),
        };
        let rec = |player: &str, opponent: &str| {
            ClassifiedRecord::new(RecordKind::Match)
                .with(MatchField::Player, player)
                .with(MatchField::Opponent, opponent)
                .with(MatchField::Timestamp, 44927.0)
        };
        let records = vec![
            rec("Jonas", "FC Nordsjælland"),
            rec("Mads", "FC Nordsjælland"),
            rec("Emil", "fc nordsjælland"),
            ClassifiedRecord::new(RecordKind::Match).with(MatchField::Player, "Oskar"),
        ];
        let groups = group_match_records(&records, &ctx);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[0].team, "My Team");
        assert_eq!(groups[1].key.opponent, "fc nordsjælland");
        assert_eq!(groups[2].key.opponent, UNKNOWN_OPPONENT);
        assert_eq!(groups[2].key.date, ctx.today);
    }

    #[test]
    fn repeated_players_collapse_last_row_wins() {
        let stat = |player: &str, goals: i64| PlayerMatchStat {
            match_id: 1,
            player_name: player.to_string(),
            goals,
            ..Default::default()
        };
        let out = collapse_repeated_players(vec![
            stat("Jonas", 1),
            stat("Mads", 0),
            stat("Jonas", 4),
        ]);
        let summary: Vec<(&str, i64)> = out
            .iter()
            .map(|s| (s.player_name.as_str(), s.goals))
            .collect();
        assert_eq!(summary, vec![("Jonas", 4), ("Mads", 0)]);
    }

    #[test]
    fn upload_result_json_shape() {
        let result = UploadResult {
            kind: Some(RecordKind::Performance),
            success_count: 2,
            errors: vec!["1 row(s) skipped: Missing exercise name".to_string()],
            details: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["kind"], "performance");
        assert_eq!(json["success_count"], 2);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn outcome_classification() {
        let mut result = UploadResult {
            success_count: 3,
            ..Default::default()
        };
        assert_eq!(result.outcome(), UploadOutcome::Success);
        result.errors.push("boom".to_string());
        assert_eq!(result.outcome(), UploadOutcome::PartialSuccess);
        result.success_count = 0;
        assert_eq!(result.outcome(), UploadOutcome::Failure);
    }
}
