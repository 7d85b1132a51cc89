use std::collections::HashMap;

use crate::store::{DATE_FORMAT, StoredPlayerStat};

pub const WEIGHT_PASSING_ACCURACY: f64 = 0.25;
pub const WEIGHT_DEFENSIVE_ACTION_RATIO: f64 = 0.15;
pub const WEIGHT_OFFENSIVE_CONTRIBUTION: f64 = 0.3;
pub const WEIGHT_DEFENSIVE_CONTRIBUTION: f64 = 0.3;

// Below this many rows the max is used instead of the 95th percentile.
const MIN_ROWS_FOR_QUANTILE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPlayerStat {
    pub player_name: String,
    pub match_label: String,
    pub goals: i64,
    pub assists: i64,
    pub passing_accuracy: f64,
    pub defensive_action_ratio: f64,
    pub offensive_contribution: f64,
    pub defensive_contribution: f64,
    pub shots_per_pass: f64,
    pub player_involvement: f64,
    pub overall_impact: f64,
    pub pressing_intensity: f64,
    pub shooting_efficiency: f64,
    pub ball_retention: f64,
    pub defensive_workrate: f64,
    pub performance_rating: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    pub player_name: String,
    pub matches: usize,
    pub goals: i64,
    pub assists: i64,
    pub avg_rating: f64,
    pub avg_passing_accuracy: f64,
}

fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

pub fn calculate_metrics(rows: &[StoredPlayerStat]) -> Vec<EnrichedPlayerStat> {
    let mut enriched: Vec<EnrichedPlayerStat> = rows.iter().map(base_metrics).collect();

    let offensive: Vec<f64> = enriched.iter().map(|e| e.offensive_contribution).collect();
    let defensive: Vec<f64> = enriched.iter().map(|e| e.defensive_contribution).collect();
    let off_top = normalization_ceiling(&offensive);
    let def_top = normalization_ceiling(&defensive);

    for e in &mut enriched {
        let norm_off = (e.offensive_contribution / (off_top + 0.01) * 100.0).min(100.0);
        let norm_def = (e.defensive_contribution / (def_top + 0.01) * 100.0).min(100.0);
        e.performance_rating = e.passing_accuracy * WEIGHT_PASSING_ACCURACY
            + e.defensive_action_ratio * WEIGHT_DEFENSIVE_ACTION_RATIO
            + norm_off * WEIGHT_OFFENSIVE_CONTRIBUTION
            + norm_def * WEIGHT_DEFENSIVE_CONTRIBUTION;
    }
    enriched
}

fn base_metrics(row: &StoredPlayerStat) -> EnrichedPlayerStat {
    let s = &row.stat;
    let total_passes = s.total_passes as f64;
    let successful_passes = s.successful_passes as f64;
    let total_shots = s.total_shots as f64;
    let total_tackles = s.total_tackles as f64;
    let tackles_opp = s.tackles_opp_half as f64;
    let tackles_own = s.tackles_own_half as f64;

    let passing_accuracy = pct(successful_passes, total_passes);
    let defensive_action_ratio = pct(tackles_opp, total_tackles);
    let offensive_contribution = total_shots * 2.0 + successful_passes * 0.5;
    let defensive_contribution = tackles_opp * 2.0 + tackles_own;
    let player_involvement = total_passes + total_shots + total_tackles;
    let ball_retention = if player_involvement > 0.0 {
        passing_accuracy * (total_passes / player_involvement)
    } else {
        0.0
    };

    EnrichedPlayerStat {
        player_name: s.player_name.clone(),
        match_label: format!("{} ({})", row.opponent, row.date.format(DATE_FORMAT)),
        goals: s.goals,
        assists: s.assists,
        passing_accuracy,
        defensive_action_ratio,
        offensive_contribution,
        defensive_contribution,
        shots_per_pass: pct(total_shots, total_passes),
        player_involvement,
        overall_impact: offensive_contribution + defensive_contribution,
        pressing_intensity: pct(tackles_opp, total_tackles),
        shooting_efficiency: pct(total_shots, player_involvement),
        ball_retention,
        defensive_workrate: pct(total_tackles, player_involvement),
        performance_rating: 0.0,
    }
}

fn normalization_ceiling(values: &[f64]) -> f64 {
    if values.len() > MIN_ROWS_FOR_QUANTILE {
        quantile(values, 0.95)
    } else {
        values.iter().copied().fold(1.0, f64::max)
    }
}

/// Linear-interpolated quantile of `values`.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = (sorted.len() - 1) as f64 * q;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match (sorted.get(base), sorted.get(base + 1)) {
        (Some(lo), Some(hi)) => lo + rest * (hi - lo),
        (Some(lo), None) => *lo,
        _ => 0.0,
    }
}

/// Per-player totals and averages, sorted by average rating (best first).
pub fn summarize_players(enriched: &[EnrichedPlayerStat]) -> Vec<PlayerSummary> {
    let mut by_player: HashMap<&str, Vec<&EnrichedPlayerStat>> = HashMap::new();
    for e in enriched {
        by_player.entry(e.player_name.as_str()).or_default().push(e);
    }

    let mut out: Vec<PlayerSummary> = by_player
        .into_iter()
        .map(|(name, rows)| {
            let n = rows.len() as f64;
            PlayerSummary {
                player_name: name.to_string(),
                matches: rows.len(),
                goals: rows.iter().map(|r| r.goals).sum(),
                assists: rows.iter().map(|r| r.assists).sum(),
                avg_rating: rows.iter().map(|r| r.performance_rating).sum::<f64>() / n,
                avg_passing_accuracy: rows.iter().map(|r| r.passing_accuracy).sum::<f64>() / n,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.avg_rating
            .total_cmp(&a.avg_rating)
            .then_with(|| a.player_name.cmp(&b.player_name))
    });
    out
}
