use thiserror::Error;

use crate::stimulus::ResponseKind;

/// A setting that falls outside its documented range
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} must be between {min} and {max}, got {value}")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: u64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid settings: {0}")]
    Config(#[from] ConfigError),

    #[error("all {total} rounds have been played")]
    SequenceExhausted { total: usize },

    #[error("{kind} response for round {round} was already judged")]
    DuplicateResponse { round: usize, kind: ResponseKind },

    #[error("round {round} is not the pending round (pending: {pending:?})")]
    UnknownRound {
        round: usize,
        pending: Option<usize>,
    },

    #[error("round {round} has nothing to look back to at depth {depth}")]
    TooEarly { round: usize, depth: usize },

    #[error("no game is running")]
    NotRunning,

    #[error("stats database error: {0}")]
    Stats(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
