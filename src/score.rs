use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::engine::RoundRecord;
use crate::stimulus::ResponseKind;

pub const HIT_POINTS: i64 = 10;
pub const FALSE_ALARM_POINTS: i64 = -5;

/// Outcome of judging one channel of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Judgement {
    Hit,
    FalseAlarm,
    Miss,
    /// No claim on a round without a match; not counted
    CorrectRejection,
}

impl Judgement {
    pub fn points(&self) -> i64 {
        match self {
            Judgement::Hit => HIT_POINTS,
            Judgement::FalseAlarm => FALSE_ALARM_POINTS,
            Judgement::Miss | Judgement::CorrectRejection => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindTally {
    pub hits: u32,
    pub false_alarms: u32,
    pub misses: u32,
}

impl KindTally {
    pub fn attempts(&self) -> u32 {
        self.hits + self.false_alarms + self.misses
    }

    /// hits / (hits + false alarms + misses), 0 when nothing was judged
    pub fn accuracy(&self) -> f64 {
        match self.attempts() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }

    fn apply(&mut self, judgement: Judgement) {
        match judgement {
            Judgement::Hit => self.hits += 1,
            Judgement::FalseAlarm => self.false_alarms += 1,
            Judgement::Miss => self.misses += 1,
            Judgement::CorrectRejection => {}
        }
    }
}

/// Running counts for the current game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub position: KindTally,
    pub text: KindTally,
    pub points: i64,
}

impl ScoreState {
    pub fn tally(&self, kind: ResponseKind) -> &KindTally {
        match kind {
            ResponseKind::Position => &self.position,
            ResponseKind::Text => &self.text,
        }
    }

    pub(crate) fn apply(&mut self, kind: ResponseKind, judgement: Judgement) {
        match kind {
            ResponseKind::Position => self.position.apply(judgement),
            ResponseKind::Text => self.text.apply(judgement),
        }
        self.points += judgement.points();
    }

    pub fn total_false_alarms(&self) -> u32 {
        self.position.false_alarms + self.text.false_alarms
    }
}

/// Immutable snapshot handed to the driver when a game closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub config: GameConfig,
    pub score: ScoreState,
    pub history: Vec<RoundRecord>,
    pub finished_at: DateTime<Local>,
    /// false when the player ended the game before the last round
    pub completed: bool,
}

impl GameResult {
    pub fn accuracy(&self, kind: ResponseKind) -> f64 {
        self.score.tally(kind).accuracy()
    }

    /// Accuracy as a percentage rounded to one decimal
    pub fn accuracy_percent(&self, kind: ResponseKind) -> f64 {
        (self.accuracy(kind) * 1000.0).round() / 10.0
    }

    /// Points floored at zero, used for display and high scores
    pub fn display_score(&self) -> i64 {
        self.score.points.max(0)
    }

    pub fn rounds_played(&self) -> usize {
        self.history.len()
    }
}
