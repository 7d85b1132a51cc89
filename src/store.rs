use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::upload::UploadResult;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub owner_id: String,
    pub date: NaiveDate,
    pub opponent: String,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchEntity {
    pub id: i64,
    pub owner_id: String,
    pub date: NaiveDate,
    pub opponent: String,
    pub team: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerMatchStat {
    pub match_id: i64,
    pub player_name: String,
    pub successful_passes: i64,
    pub total_passes: i64,
    pub total_shots: i64,
    pub tackles_own_half: i64,
    pub tackles_opp_half: i64,
    pub total_tackles: i64,
    pub goals: i64,
    pub assists: i64,
    pub minutes_played: i64,
    pub yellow_cards: i64,
    pub red_cards: i64,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerformanceStat {
    pub owner_id: String,
    pub player_name: String,
    pub exercise: String,
    pub pr_1: Option<f64>,
    pub pr_2: Option<f64>,
    pub pr_3: Option<f64>,
    pub pr_4: Option<f64>,
}

/// A player stat row joined with its match.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPlayerStat {
    pub stat: PlayerMatchStat,
    pub date: NaiveDate,
    pub opponent: String,
}

/// The relational store the upload engine writes through.
pub trait StatStore {
    fn find_match(&mut self, date: NaiveDate, opponent: &str) -> Result<Option<i64>>;

    fn insert_match(&mut self, new_match: &NewMatch) -> Result<i64>;

    /// Insert-or-update keyed by (match_id, player_name). Returns rows written.
    fn upsert_player_stats(&mut self, rows: &[PlayerMatchStat]) -> Result<usize>;

    /// Insert-or-update keyed by (owner_id, player_name, exercise).
    fn upsert_performance_stats(&mut self, rows: &[PerformanceStat]) -> Result<usize>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count_matches(&self) -> Result<usize> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))
            .context("count matches")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    pub fn load_matches(&self) -> Result<Vec<MatchEntity>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, owner_id, date, opponent, team, created_at
                 FROM matches ORDER BY date ASC, id ASC",
            )
            .context("prepare load matches query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(MatchEntity {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    date: row.get::<_, String>(2)?.parse_date(2)?,
                    opponent: row.get(3)?,
                    team: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .context("query load matches")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode match row")?);
        }
        Ok(out)
    }

    pub fn load_player_stats(&self) -> Result<Vec<StoredPlayerStat>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT
                    s.match_id, s.player_name, s.successful_passes, s.total_passes,
                    s.total_shots, s.tackles_own_half, s.tackles_opp_half, s.total_tackles,
                    s.goals, s.assists, s.minutes_played, s.yellow_cards, s.red_cards,
                    s.feedback, m.date, m.opponent
                FROM player_stats s
                JOIN matches m ON m.id = s.match_id
                ORDER BY m.date ASC, m.id ASC, s.player_name ASC
                "#,
            )
            .context("prepare load player stats query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredPlayerStat {
                    stat: PlayerMatchStat {
                        match_id: row.get(0)?,
                        player_name: row.get(1)?,
                        successful_passes: row.get(2)?,
                        total_passes: row.get(3)?,
                        total_shots: row.get(4)?,
                        tackles_own_half: row.get(5)?,
                        tackles_opp_half: row.get(6)?,
                        total_tackles: row.get(7)?,
                        goals: row.get(8)?,
                        assists: row.get(9)?,
                        minutes_played: row.get(10)?,
                        yellow_cards: row.get(11)?,
                        red_cards: row.get(12)?,
                        feedback: row.get(13)?,
                    },
                    date: row.get::<_, String>(14)?.parse_date(14)?,
                    opponent: row.get(15)?,
                })
            })
            .context("query load player stats")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode player stat row")?);
        }
        Ok(out)
    }

    pub fn load_performance_stats(&self) -> Result<Vec<PerformanceStat>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT owner_id, player_name, exercise, pr_1, pr_2, pr_3, pr_4
                 FROM performance_stats ORDER BY player_name ASC, exercise ASC",
            )
            .context("prepare load performance stats query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PerformanceStat {
                    owner_id: row.get(0)?,
                    player_name: row.get(1)?,
                    exercise: row.get(2)?,
                    pr_1: row.get(3)?,
                    pr_2: row.get(4)?,
                    pr_3: row.get(5)?,
                    pr_4: row.get(6)?,
                })
            })
            .context("query load performance stats")?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode performance stat row")?);
        }
        Ok(out)
    }

    /// Appends one row to the upload ledger.
    pub fn record_upload_run(
        &self,
        source: &str,
        started_at: &str,
        result: &UploadResult,
    ) -> Result<i64> {
        let errors_json =
            serde_json::to_string(&result.errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "INSERT INTO upload_runs(started_at, finished_at, source, kind, success_count, errors_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    started_at,
                    Utc::now().to_rfc3339(),
                    source,
                    result.kind.map(|k| k.label()),
                    result.success_count as i64,
                    errors_json,
                ],
            )
            .context("insert upload run")?;
        Ok(self.conn.last_insert_rowid())
    }
}

trait ParseDate {
    fn parse_date(&self, column: usize) -> rusqlite::Result<NaiveDate>;
}

impl ParseDate for String {
    fn parse_date(&self, column: usize) -> rusqlite::Result<NaiveDate> {
        NaiveDate::parse_from_str(self, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            date TEXT NOT NULL,
            opponent TEXT NOT NULL,
            team TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_matches_date_opponent ON matches(date, opponent);

        CREATE TABLE IF NOT EXISTS player_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
            player_name TEXT NOT NULL,
            successful_passes INTEGER NOT NULL DEFAULT 0,
            total_passes INTEGER NOT NULL DEFAULT 0,
            total_shots INTEGER NOT NULL DEFAULT 0,
            tackles_own_half INTEGER NOT NULL DEFAULT 0,
            tackles_opp_half INTEGER NOT NULL DEFAULT 0,
            total_tackles INTEGER NOT NULL DEFAULT 0,
            goals INTEGER NOT NULL DEFAULT 0,
            assists INTEGER NOT NULL DEFAULT 0,
            minutes_played INTEGER NOT NULL DEFAULT 0,
            yellow_cards INTEGER NOT NULL DEFAULT 0,
            red_cards INTEGER NOT NULL DEFAULT 0,
            feedback TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL,
            UNIQUE(match_id, player_name)
        );
        CREATE INDEX IF NOT EXISTS idx_player_stats_player ON player_stats(player_name);

        CREATE TABLE IF NOT EXISTS performance_stats (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            player_name TEXT NOT NULL,
            exercise TEXT NOT NULL,
            pr_1 REAL NULL,
            pr_2 REAL NULL,
            pr_3 REAL NULL,
            pr_4 REAL NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(owner_id, player_name, exercise)
        );

        CREATE TABLE IF NOT EXISTS upload_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            kind TEXT NULL,
            success_count INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

impl StatStore for SqliteStore {
    fn find_match(&mut self, date: NaiveDate, opponent: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM matches WHERE date = ?1 AND opponent = ?2",
                params![date.format(DATE_FORMAT).to_string(), opponent],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .context("select match by date and opponent")
    }

    fn insert_match(&mut self, new_match: &NewMatch) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO matches(owner_id, date, opponent, team, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new_match.owner_id,
                    new_match.date.format(DATE_FORMAT).to_string(),
                    new_match.opponent,
                    new_match.team,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("insert match")?;
        Ok(self.conn.last_insert_rowid())
    }

    fn upsert_player_stats(&mut self, rows: &[PlayerMatchStat]) -> Result<usize> {
        let tx = self.conn.transaction().context("begin player stats transaction")?;
        let now = Utc::now().to_rfc3339();
        for s in rows {
            if s.player_name.trim().is_empty() {
                return Err(anyhow!("player stat row for match {} has no player", s.match_id));
            }
            tx.execute(
                r#"
                INSERT INTO player_stats (
                    match_id, player_name, successful_passes, total_passes, total_shots,
                    tackles_own_half, tackles_opp_half, total_tackles, goals, assists,
                    minutes_played, yellow_cards, red_cards, feedback, updated_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9, ?10,
                    ?11, ?12, ?13, ?14, ?15
                )
                ON CONFLICT(match_id, player_name) DO UPDATE SET
                    successful_passes = excluded.successful_passes,
                    total_passes = excluded.total_passes,
                    total_shots = excluded.total_shots,
                    tackles_own_half = excluded.tackles_own_half,
                    tackles_opp_half = excluded.tackles_opp_half,
                    total_tackles = excluded.total_tackles,
                    goals = excluded.goals,
                    assists = excluded.assists,
                    minutes_played = excluded.minutes_played,
                    yellow_cards = excluded.yellow_cards,
                    red_cards = excluded.red_cards,
                    feedback = excluded.feedback,
                    updated_at = excluded.updated_at
                "#,
                params![
                    s.match_id,
                    s.player_name,
                    s.successful_passes,
                    s.total_passes,
                    s.total_shots,
                    s.tackles_own_half,
                    s.tackles_opp_half,
                    s.total_tackles,
                    s.goals,
                    s.assists,
                    s.minutes_played,
                    s.yellow_cards,
                    s.red_cards,
                    s.feedback,
                    now,
                ],
            )
            .context("upsert player stat")?;
        }
        tx.commit().context("commit player stats transaction")?;
        Ok(rows.len())
    }

    fn upsert_performance_stats(&mut self, rows: &[PerformanceStat]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .context("begin performance stats transaction")?;
        let now = Utc::now().to_rfc3339();
        for p in rows {
            tx.execute(
                r#"
                INSERT INTO performance_stats (
                    owner_id, player_name, exercise, pr_1, pr_2, pr_3, pr_4, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(owner_id, player_name, exercise) DO UPDATE SET
                    pr_1 = excluded.pr_1,
                    pr_2 = excluded.pr_2,
                    pr_3 = excluded.pr_3,
                    pr_4 = excluded.pr_4,
                    updated_at = excluded.updated_at
                "#,
                params![
                    p.owner_id,
                    p.player_name,
                    p.exercise,
                    p.pr_1,
                    p.pr_2,
                    p.pr_3,
                    p.pr_4,
                    now,
                ],
            )
            .context("upsert performance stat")?;
        }
        tx.commit().context("commit performance stats transaction")?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stat(match_id: i64, player: &str, goals: i64) -> PlayerMatchStat {
        PlayerMatchStat {
            match_id,
            player_name: player.to_string(),
            goals,
            ..Default::default()
        }
    }

    #[test]
    fn find_or_create_round_trip() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let day = date(2023, 1, 1);
        assert_eq!(store.find_match(day, "B93").unwrap(), None);
        let id = store
            .insert_match(&NewMatch {
                owner_id: "local".to_string(),
                date: day,
                opponent: "B93".to_string(),
                team: "U17".to_string(),
            })
            .unwrap();
        assert_eq!(store.find_match(day, "B93").unwrap(), Some(id));
        assert_eq!(store.find_match(day, "b93").unwrap(), None);
        let matches = store.load_matches().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].team, "U17");
        assert_eq!(matches[0].date, day);
    }

    #[test]
    fn duplicate_match_insert_is_rejected() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let new_match = NewMatch {
            owner_id: "local".to_string(),
            date: date(2023, 5, 4),
            opponent: "AB".to_string(),
            team: "U19".to_string(),
        };
        store.insert_match(&new_match).unwrap();
        assert!(store.insert_match(&new_match).is_err());
    }

    #[test]
    fn player_stat_upsert_overwrites() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let id = store
            .insert_match(&NewMatch {
                owner_id: "local".to_string(),
                date: date(2023, 1, 1),
                opponent: "B93".to_string(),
                team: "U17".to_string(),
            })
            .unwrap();
        store.upsert_player_stats(&[stat(id, "Jonas", 1)]).unwrap();
        store.upsert_player_stats(&[stat(id, "Jonas", 3)]).unwrap();
        let rows = store.load_player_stats().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stat.goals, 3);
        assert_eq!(rows[0].opponent, "B93");
    }

    #[test]
    fn failing_row_rolls_back_batch() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        // No such match: the foreign key rejects the second row.
        let id = store
            .insert_match(&NewMatch {
                owner_id: "local".to_string(),
                date: date(2023, 1, 1),
                opponent: "B93".to_string(),
                team: "U17".to_string(),
            })
            .unwrap();
        let err = store.upsert_player_stats(&[stat(id, "Jonas", 1), stat(id + 99, "Mads", 1)]);
        assert!(err.is_err());
        assert!(store.load_player_stats().unwrap().is_empty());
    }

    #[test]
    fn performance_upsert_keyed_by_owner_player_exercise() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let row = PerformanceStat {
            owner_id: "local".to_string(),
            player_name: "Anna".to_string(),
            exercise: "Squat".to_string(),
            pr_1: Some(80.0),
            ..Default::default()
        };
        store.upsert_performance_stats(&[row.clone()]).unwrap();
        let updated = PerformanceStat {
            pr_1: Some(90.0),
            ..row
        };
        store.upsert_performance_stats(&[updated]).unwrap();
        let rows = store.load_performance_stats().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pr_1, Some(90.0));
        assert_eq!(rows[0].pr_2, None);
    }
}
