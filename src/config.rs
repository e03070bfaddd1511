use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::stimulus::{char_pool, CharSet, LetterCase};

pub const N_LEVEL_RANGE: RangeInclusive<usize> = 1..=9;
pub const GRID_RANGE: RangeInclusive<usize> = 2..=6;
pub const ROUND_DURATION_MS_RANGE: RangeInclusive<u64> = 1_000..=10_000;
pub const TOTAL_ROUNDS_RANGE: RangeInclusive<usize> = 10..=100;
pub const STRING_LENGTH_RANGE: RangeInclusive<usize> = 1..=6;

/// Settings for one game; immutable once the game starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub n_level: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub round_duration_ms: u64,
    pub total_rounds: usize,
    pub string_length: usize,
    pub charset: CharSet,
    pub letter_case: LetterCase,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            n_level: 2,
            grid_rows: 3,
            grid_cols: 3,
            round_duration_ms: 3_000,
            total_rounds: 20,
            string_length: 2,
            charset: CharSet::Letters,
            letter_case: LetterCase::Capital,
        }
    }
}

fn check(field: &'static str, value: u64, range: &RangeInclusive<u64>) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn widen(range: RangeInclusive<usize>) -> RangeInclusive<u64> {
    *range.start() as u64..=*range.end() as u64
}

impl GameConfig {
    /// Check every field against its documented range
    pub fn validate(&self) -> Result<(), ConfigError> {
        check("n_level", self.n_level as u64, &widen(N_LEVEL_RANGE))?;
        check("grid_rows", self.grid_rows as u64, &widen(GRID_RANGE))?;
        check("grid_cols", self.grid_cols as u64, &widen(GRID_RANGE))?;
        check(
            "round_duration_ms",
            self.round_duration_ms,
            &ROUND_DURATION_MS_RANGE,
        )?;
        check("total_rounds", self.total_rounds as u64, &widen(TOTAL_ROUNDS_RANGE))?;
        check("string_length", self.string_length as u64, &widen(STRING_LENGTH_RANGE))?;
        Ok(())
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_duration_ms)
    }

    pub fn cell_count(&self) -> usize {
        self.grid_rows * self.grid_cols
    }

    pub fn char_pool(&self) -> Vec<char> {
        char_pool(self.charset, self.letter_case)
    }

    pub fn grid_label(&self) -> String {
        format!("{}x{}", self.grid_rows, self.grid_cols)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        let (n_level, total_rounds) = preset.levels();
        self.n_level = n_level;
        self.total_rounds = total_rounds;
    }
}

/// Quick-start difficulty presets
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, strum_macros::Display)]
pub enum Preset {
    Easy,
    Medium,
    Hard,
}

impl Preset {
    /// (n-back depth, total rounds)
    pub fn levels(&self) -> (usize, usize) {
        match self {
            Preset::Easy => (2, 20),
            Preset::Medium => (3, 25),
            Preset::Hard => (4, 30),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "dualback") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("dualback_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Falls back to defaults when the file is missing, unreadable or out of range
    fn load(&self) -> GameConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<GameConfig>(&bytes) {
                Ok(cfg) if cfg.validate().is_ok() => return cfg,
                Ok(_) => tracing::warn!("ignoring out-of-range settings in {:?}", self.path),
                Err(e) => tracing::warn!("ignoring unreadable settings in {:?}: {}", self.path, e),
            }
        }
        GameConfig::default()
    }

    fn save(&self, cfg: &GameConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(std::io::Error::other)?;
        fs::write(&self.path, data)
    }
}
