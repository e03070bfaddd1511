use clap::ValueEnum;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";

/// Which characters the stimulus text is drawn from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CharSet {
    Letters,
    Numbers,
    Combination,
}

/// Letter case for text stimuli; ignored for `CharSet::Numbers`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LetterCase {
    Capital,
    Lowercase,
    Combination,
}

/// The two stimulus channels a player can claim a match on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseKind {
    Position,
    Text,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 2] = [ResponseKind::Position, ResponseKind::Text];
}

/// Grid cell as (row, column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for Position {
    fn from(v: (usize, usize)) -> Self {
        Position { row: v.0, col: v.1 }
    }
}

/// What is shown to the player in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stimulus {
    pub position: Position,
    pub text: String,
}

impl Stimulus {
    pub fn new(position: impl Into<Position>, text: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            text: text.into(),
        }
    }

    pub fn matches(&self, other: &Stimulus, kind: ResponseKind) -> bool {
        match kind {
            ResponseKind::Position => self.position == other.position,
            ResponseKind::Text => self.text == other.text,
        }
    }
}

/// Character pool for a charset/case combination
pub fn char_pool(charset: CharSet, case: LetterCase) -> Vec<char> {
    let letters = match case {
        LetterCase::Capital => UPPERCASE.to_string(),
        LetterCase::Lowercase => LOWERCASE.to_string(),
        LetterCase::Combination => format!("{LOWERCASE}{UPPERCASE}"),
    };

    let pool = match charset {
        CharSet::Letters => letters,
        CharSet::Numbers => DIGITS.to_string(),
        CharSet::Combination => format!("{letters}{DIGITS}"),
    };

    pool.chars().collect()
}

/// Uniformly random text of `length` characters from `pool`
pub fn random_text<R: Rng + ?Sized>(rng: &mut R, pool: &[char], length: usize) -> String {
    (0..length)
        .filter_map(|_| pool.choose(rng).copied())
        .collect()
}
