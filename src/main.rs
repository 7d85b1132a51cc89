use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use squad_ingest::aliases::{AliasTables, RecordKind};
use squad_ingest::config::{self, IngestConfig};
use squad_ingest::export;
use squad_ingest::parser;
use squad_ingest::store::SqliteStore;
use squad_ingest::upload::{self, UploadContext, UploadOutcome, UploadResult};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if let Some((kind, out)) = parse_template_arg(&args)? {
        write_template(kind, &out)?;
        return Ok(true);
    }

    let cfg = IngestConfig::from_env();
    let files = config::positional_args(&args);
    if files.is_empty() {
        return Err(anyhow!(
            "usage: squad_ingest [--db PATH] [--json] FILE...\n       squad_ingest --template match|performance OUT.xlsx"
        ));
    }
    let json = args.iter().any(|a| a == "--json");

    let db_path = config::parse_db_path_arg(&args)
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let mut store = SqliteStore::open(&db_path)?;
    let ctx = UploadContext::from_config(&cfg);

    let mut all_ok = true;
    for file in &files {
        let path = PathBuf::from(file);
        let started_at = Utc::now().to_rfc3339();
        let result = ingest_file(&mut store, &path, &ctx);
        if let Err(err) = store.record_upload_run(file, &started_at, &result) {
            log::warn!("could not record upload run for {file}: {err:#}");
        }
        if result.outcome() == UploadOutcome::Failure {
            all_ok = false;
        }
        if json {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            print_summary(file, &db_path, &result);
        }
    }
    Ok(all_ok)
}

fn ingest_file(store: &mut SqliteStore, path: &Path, ctx: &UploadContext) -> UploadResult {
    match parser::parse_file(path, AliasTables::default()) {
        Ok(parsed) => upload::upload_records(store, &parsed.records, ctx),
        Err(err) => {
            log::warn!("{}: {err}", path.display());
            UploadResult {
                errors: vec![err.to_string()],
                ..Default::default()
            }
        }
    }
}

fn print_summary(file: &str, db_path: &Path, result: &UploadResult) {
    let outcome = match result.outcome() {
        UploadOutcome::Success => "complete",
        UploadOutcome::PartialSuccess => "partially complete",
        UploadOutcome::Failure => "failed",
    };
    println!("Upload {outcome}: {file}");
    println!("DB: {}", db_path.display());
    if let Some(kind) = result.kind {
        println!("Type: {kind}");
    }
    println!("Rows upserted: {}", result.success_count);
    if let Some(details) = &result.details {
        println!(
            "Matches: {} created, {} reused",
            details.matches_created, details.matches_updated
        );
        println!("Players: {}", details.players_affected.len());
    }
    if !result.errors.is_empty() {
        println!("Errors: {}", result.errors.len());
        for err in result.errors.iter().take(8) {
            println!(" - {err}");
        }
    }
}

fn parse_template_arg(args: &[String]) -> Result<Option<(RecordKind, PathBuf)>> {
    let Some(idx) = args.iter().position(|a| a == "--template") else {
        return Ok(None);
    };
    let kind = match args.get(idx + 1).map(|s| s.trim().to_ascii_lowercase()) {
        Some(k) if k == "match" => RecordKind::Match,
        Some(k) if k == "performance" || k == "gym" => RecordKind::Performance,
        _ => return Err(anyhow!("--template expects `match` or `performance`")),
    };
    let out = args
        .get(idx + 2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}_template.xlsx", kind.label())));
    Ok(Some((kind, out)))
}

fn write_template(kind: RecordKind, out: &Path) -> Result<()> {
    let table = AliasTables::default().for_kind(kind);
    let bytes = export::template_workbook_bytes(table)?;
    std::fs::write(out, bytes).with_context(|| format!("write {}", out.display()))?;
    println!("Template written: {}", out.display());
    Ok(())
}
