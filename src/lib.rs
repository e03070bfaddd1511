// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod runtime;
pub mod score;
pub mod session;
pub mod stats;
pub mod stimulus;
pub mod ui;
pub mod util;

pub use app::{App, AppState};
pub use config::{ConfigStore, FileConfigStore, GameConfig, Preset};
pub use engine::{GamePhase, RoundEngine, RoundRecord};
pub use error::{ConfigError, Error, Result};
pub use generator::{FairGenerator, StimulusSource};
pub use score::{GameResult, Judgement, KindTally, ScoreState};
pub use stimulus::{CharSet, LetterCase, Position, ResponseKind, Stimulus};
