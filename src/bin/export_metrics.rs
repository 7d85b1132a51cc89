use std::path::PathBuf;

use anyhow::{Context, Result};

use squad_ingest::config::{self, IngestConfig};
use squad_ingest::export::export_metrics;
use squad_ingest::metrics::{calculate_metrics, summarize_players};
use squad_ingest::store::SqliteStore;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = IngestConfig::from_env();
    let db_path = config::parse_db_path_arg(&args)
        .or(cfg.db_path)
        .context("unable to resolve sqlite path")?;
    let out = config::positional_args(&args)
        .into_iter()
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("player_metrics.xlsx"));

    let store = SqliteStore::open(&db_path)?;
    let rows = store.load_player_stats()?;
    if rows.is_empty() {
        log::warn!("no player stats in {}", db_path.display());
    }
    let enriched = calculate_metrics(&rows);
    let summaries = summarize_players(&enriched);
    let report = export_metrics(&out, &enriched, &summaries)?;

    println!("Export complete: {}", out.display());
    println!("DB: {}", db_path.display());
    println!("Stat rows: {}", report.stat_rows);
    println!("Players: {}", report.players);
    Ok(())
}
