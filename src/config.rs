use std::path::PathBuf;

const CACHE_DIR: &str = "squad_ingest";
const DB_FILE: &str = "squad.sqlite";

pub const DEFAULT_OWNER_ID: &str = "local";
pub const DEFAULT_TEAM: &str = "My Team";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub db_path: Option<PathBuf>,
    pub owner_id: String,
    pub default_team: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            owner_id: DEFAULT_OWNER_ID.to_string(),
            default_team: DEFAULT_TEAM.to_string(),
        }
    }
}

impl IngestConfig {
    /// Loads `.env.local` and `.env` (if present) and reads overrides from
    /// the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(path) = non_empty(lookup("SQUAD_DB_PATH")) {
            cfg.db_path = Some(PathBuf::from(path));
        }
        if let Some(owner) = non_empty(lookup("SQUAD_OWNER_ID")) {
            cfg.owner_id = owner;
        }
        if let Some(team) = non_empty(lookup("SQUAD_DEFAULT_TEAM")) {
            cfg.default_team = team;
        }
        cfg
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

/// `--db=<path>` or `--db <path>`.
pub fn parse_db_path_arg(args: &[String]) -> Option<PathBuf> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db" {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}

/// Positional arguments, skipping `--db` and its value.
pub fn positional_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--db" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}
