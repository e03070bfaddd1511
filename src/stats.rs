use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::score::GameResult;
use crate::stimulus::ResponseKind;

/// One row of the game history log
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub played_at: DateTime<Local>,
    pub n_level: usize,
    pub grid: String,
    pub rounds: usize,
    pub rounds_played: usize,
    pub score: i64,
    pub position_accuracy: f64,
    pub text_accuracy: f64,
    pub completed: bool,
}

/// What recording a game did to the level's high score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub high_score: i64,
    /// The recorded game reached (or set) the level's high score
    pub is_high_score: bool,
    /// The stored high score changed; false on a tie
    pub raised: bool,
}

/// SQLite-backed store for per-level high scores and the game history log
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Open the database at the default state path, creating it if needed
    pub fn new() -> Result<Self> {
        Self::open(AppDirs::db_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                played_at TEXT NOT NULL,
                n_level INTEGER NOT NULL,
                grid TEXT NOT NULL,
                rounds INTEGER NOT NULL,
                rounds_played INTEGER NOT NULL,
                score INTEGER NOT NULL,
                position_accuracy REAL NOT NULL,
                text_accuracy REAL NOT NULL,
                position_hits INTEGER NOT NULL,
                position_misses INTEGER NOT NULL,
                position_false_alarms INTEGER NOT NULL,
                text_hits INTEGER NOT NULL,
                text_misses INTEGER NOT NULL,
                text_false_alarms INTEGER NOT NULL,
                completed BOOLEAN NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_level ON games(n_level, played_at)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS high_scores (
                n_level INTEGER PRIMARY KEY,
                score INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(StatsDb { conn })
    }

    /// Append `result` to the history and merge it into the level's high score
    pub fn record_game(&mut self, result: &GameResult) -> Result<RecordOutcome> {
        let score = result.display_score();
        let n_level = result.config.n_level as i64;
        let played_at = result.finished_at.to_rfc3339();
        let position = result.score.position;
        let text = result.score.text;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO games
            (played_at, n_level, grid, rounds, rounds_played, score,
             position_accuracy, text_accuracy,
             position_hits, position_misses, position_false_alarms,
             text_hits, text_misses, text_false_alarms, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                played_at,
                n_level,
                result.config.grid_label(),
                result.config.total_rounds as i64,
                result.rounds_played() as i64,
                score,
                result.accuracy_percent(ResponseKind::Position),
                result.accuracy_percent(ResponseKind::Text),
                position.hits,
                position.misses,
                position.false_alarms,
                text.hits,
                text.misses,
                text.false_alarms,
                result.completed,
            ],
        )?;

        let raised = tx.execute(
            r#"
            INSERT INTO high_scores (n_level, score, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(n_level) DO UPDATE SET
                score = excluded.score,
                updated_at = excluded.updated_at
            WHERE excluded.score > high_scores.score
            "#,
            params![n_level, score, played_at],
        )? > 0;

        let high_score: i64 = tx.query_row(
            "SELECT score FROM high_scores WHERE n_level = ?1",
            [n_level],
            |row| row.get(0),
        )?;
        tx.commit()?;

        if raised {
            info!(n_level, score, "new high score");
        }

        Ok(RecordOutcome {
            high_score,
            is_high_score: score >= high_score,
            raised,
        })
    }

    pub fn high_score(&self, n_level: usize) -> Result<Option<i64>> {
        let score = self
            .conn
            .query_row(
                "SELECT score FROM high_scores WHERE n_level = ?1",
                [n_level as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score)
    }

    /// (n_level, score) pairs ordered by level
    pub fn high_scores(&self) -> Result<Vec<(usize, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT n_level, score FROM high_scores ORDER BY n_level")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)?))
        })?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?);
        }
        Ok(scores)
    }

    /// Most recent games first
    pub fn recent_games(&self, limit: usize) -> Result<Vec<GameRecord>> {
        self.query_games(
            r#"
            SELECT played_at, n_level, grid, rounds, rounds_played, score,
                   position_accuracy, text_accuracy, completed
            FROM games
            ORDER BY id DESC
            LIMIT ?1
            "#,
            params![limit as i64],
        )
    }

    /// Scores at one level in the order they were played, limited to the latest `limit`
    pub fn level_scores(&self, n_level: usize, limit: usize) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT score FROM (
                SELECT id, score FROM games WHERE n_level = ?1 ORDER BY id DESC LIMIT ?2
            ) ORDER BY id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![n_level as i64, limit as i64], |row| row.get(0))?;

        let mut scores = Vec::new();
        for row in rows {
            scores.push(row?);
        }
        Ok(scores)
    }

    fn query_games(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            let played_at: String = row.get(0)?;
            let played_at = DateTime::parse_from_rfc3339(&played_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        0,
                        "played_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(GameRecord {
                played_at,
                n_level: row.get::<_, i64>(1)? as usize,
                grid: row.get(2)?,
                rounds: row.get::<_, i64>(3)? as usize,
                rounds_played: row.get::<_, i64>(4)? as usize,
                score: row.get(5)?,
                position_accuracy: row.get(6)?,
                text_accuracy: row.get(7)?,
                completed: row.get(8)?,
            })
        })?;

        let mut games = Vec::new();
        for game in rows {
            games.push(game?);
        }
        Ok(games)
    }

    /// Clear all statistics (for testing or reset purposes)
    pub fn clear_all(&self) -> Result<()> {
        self.conn.execute("DELETE FROM games", [])?;
        self.conn.execute("DELETE FROM high_scores", [])?;
        Ok(())
    }
}
