use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::generator::{FairGenerator, StimulusSource};
use crate::score::{GameResult, Judgement, ScoreState};
use crate::stimulus::{ResponseKind, Stimulus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Idle,
    Configured,
    Running,
    Finished,
}

/// One generated round with its ground truth against round `index - n_level`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub index: usize,
    pub stimulus: Stimulus,
    pub position_match: bool,
    pub text_match: bool,
}

impl RoundRecord {
    pub fn is_match(&self, kind: ResponseKind) -> bool {
        match kind {
            ResponseKind::Position => self.position_match,
            ResponseKind::Text => self.text_match,
        }
    }
}

/// Which channels of the newest round have been judged
#[derive(Debug, Clone, Copy, Default)]
struct Pending {
    position: bool,
    text: bool,
}

impl Pending {
    fn judged(&self, kind: ResponseKind) -> bool {
        match kind {
            ResponseKind::Position => self.position,
            ResponseKind::Text => self.text,
        }
    }

    fn mark(&mut self, kind: ResponseKind) {
        match kind {
            ResponseKind::Position => self.position = true,
            ResponseKind::Text => self.text = true,
        }
    }
}

/// Headless n-back game: owns the history and score of one game at a time.
///
/// The driver calls [`start`](Self::start), then alternates
/// [`next_stimulus`](Self::next_stimulus) with
/// [`submit_response`](Self::submit_response) /
/// [`on_round_timeout`](Self::on_round_timeout), and closes with
/// [`finish`](Self::finish). Timing, rendering and persistence live outside.
pub struct RoundEngine {
    source: Box<dyn StimulusSource>,
    config: Option<GameConfig>,
    phase: GamePhase,
    history: Vec<RoundRecord>,
    score: ScoreState,
    pending: Pending,
    result: Option<GameResult>,
}

impl RoundEngine {
    pub fn new() -> Self {
        Self::with_source(Box::new(FairGenerator::new()))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_source(Box::new(FairGenerator::with_seed(seed)))
    }

    pub fn with_source(source: Box<dyn StimulusSource>) -> Self {
        Self {
            source,
            config: None,
            phase: GamePhase::Idle,
            history: Vec::new(),
            score: ScoreState::default(),
            pending: Pending::default(),
            result: None,
        }
    }

    /// Validate `config` and begin a new game, discarding any previous one.
    /// On error nothing changes.
    pub fn start(&mut self, config: GameConfig) -> Result<()> {
        config.validate()?;

        info!(
            n_level = config.n_level,
            grid = %config.grid_label(),
            rounds = config.total_rounds,
            "starting game"
        );

        self.source.reset();
        self.history = Vec::with_capacity(config.total_rounds);
        self.score = ScoreState::default();
        self.pending = Pending::default();
        self.result = None;
        self.config = Some(config);
        self.phase = GamePhase::Configured;
        Ok(())
    }

    /// Close the previous round and show the next one
    pub fn next_stimulus(&mut self) -> Result<Stimulus> {
        if !self.is_active() {
            return Err(Error::NotRunning);
        }
        let config = self.config.as_ref().ok_or(Error::NotRunning)?;
        if self.history.len() >= config.total_rounds {
            return Err(Error::SequenceExhausted {
                total: config.total_rounds,
            });
        }

        self.close_pending();

        let config = self.config.as_ref().ok_or(Error::NotRunning)?;
        let index = self.history.len();
        let lookback = index
            .checked_sub(config.n_level)
            .and_then(|i| self.history.get(i))
            .map(|r| &r.stimulus);

        let stimulus = self.source.next_stimulus(config, lookback);
        let position_match =
            lookback.is_some_and(|prev| stimulus.matches(prev, ResponseKind::Position));
        let text_match = lookback.is_some_and(|prev| stimulus.matches(prev, ResponseKind::Text));

        debug!(
            round = index,
            row = stimulus.position.row,
            col = stimulus.position.col,
            text = %stimulus.text,
            position_match,
            text_match,
            "generated round"
        );

        self.history.push(RoundRecord {
            index,
            stimulus: stimulus.clone(),
            position_match,
            text_match,
        });
        self.pending = Pending::default();
        self.phase = GamePhase::Running;
        Ok(stimulus)
    }

    /// Judge a player's claim that `kind` matches for `round`
    pub fn submit_response(&mut self, kind: ResponseKind, round: usize) -> Result<Judgement> {
        let record = self.pending_record(round)?;
        if self.pending.judged(kind) {
            return Err(Error::DuplicateResponse { round, kind });
        }
        let n_level = self.n_level();
        if round < n_level {
            return Err(Error::TooEarly {
                round,
                depth: n_level,
            });
        }

        let judgement = if record.is_match(kind) {
            Judgement::Hit
        } else {
            Judgement::FalseAlarm
        };

        self.pending.mark(kind);
        self.score.apply(kind, judgement);
        debug!(round, %kind, %judgement, points = self.score.points, "judged claim");
        Ok(judgement)
    }

    /// The display window of `round` elapsed: every unjudged channel is closed,
    /// true matches count as misses. Repeated timeouts return an empty list.
    pub fn on_round_timeout(&mut self, round: usize) -> Result<Vec<(ResponseKind, Judgement)>> {
        self.pending_record(round)?;
        Ok(self.close_pending())
    }

    /// End the game and return its result; later calls return the same snapshot
    pub fn finish(&mut self) -> Result<GameResult> {
        match self.phase {
            GamePhase::Idle => return Err(Error::NotRunning),
            GamePhase::Finished => {
                return self.result.clone().ok_or(Error::NotRunning);
            }
            GamePhase::Configured | GamePhase::Running => {}
        }

        self.close_pending();

        let config = self.config.clone().ok_or(Error::NotRunning)?;
        let completed = self.history.len() == config.total_rounds;
        let result = GameResult {
            config,
            score: self.score,
            history: self.history.clone(),
            finished_at: Local::now(),
            completed,
        };

        info!(
            points = result.score.points,
            rounds = result.rounds_played(),
            completed,
            "game finished"
        );

        self.phase = GamePhase::Finished;
        self.result = Some(result.clone());
        Ok(result)
    }

    fn is_active(&self) -> bool {
        matches!(self.phase, GamePhase::Configured | GamePhase::Running)
    }

    fn n_level(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.n_level)
    }

    fn pending_record(&self, round: usize) -> Result<&RoundRecord> {
        if !self.is_active() {
            return Err(Error::NotRunning);
        }
        match self.history.last() {
            Some(record) if record.index == round => Ok(record),
            last => Err(Error::UnknownRound {
                round,
                pending: last.map(|r| r.index),
            }),
        }
    }

    fn close_pending(&mut self) -> Vec<(ResponseKind, Judgement)> {
        let Some(record) = self.history.last() else {
            return Vec::new();
        };

        let mut closed = Vec::new();
        for kind in ResponseKind::ALL {
            if self.pending.judged(kind) {
                continue;
            }
            let judgement = if record.is_match(kind) {
                Judgement::Miss
            } else {
                Judgement::CorrectRejection
            };
            closed.push((kind, judgement));
        }

        let round = record.index;
        for &(kind, judgement) in &closed {
            self.pending.mark(kind);
            self.score.apply(kind, judgement);
            if judgement == Judgement::Miss {
                debug!(round, %kind, "missed match");
            }
        }
        closed
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn config(&self) -> Option<&GameConfig> {
        self.config.as_ref()
    }

    /// Index of the round awaiting judgement
    pub fn current_round(&self) -> Option<usize> {
        if self.is_active() {
            self.history.last().map(|r| r.index)
        } else {
            None
        }
    }

    pub fn current_stimulus(&self) -> Option<&Stimulus> {
        self.current_round()
            .and_then(|i| self.history.get(i))
            .map(|r| &r.stimulus)
    }

    pub fn rounds_played(&self) -> usize {
        self.history.len()
    }

    pub fn rounds_remaining(&self) -> usize {
        self.config
            .as_ref()
            .map_or(0, |c| c.total_rounds.saturating_sub(self.history.len()))
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    /// Whether `kind` has already been judged for the current round
    pub fn is_judged(&self, kind: ResponseKind) -> bool {
        self.current_round().is_some() && self.pending.judged(kind)
    }

    /// Whether the current round has an n-back stimulus to compare against
    pub fn can_match(&self) -> bool {
        self.current_round().is_some_and(|i| i >= self.n_level())
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }
}

impl Default for RoundEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RoundEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundEngine")
            .field("phase", &self.phase)
            .field("config", &self.config)
            .field("rounds", &self.history.len())
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::VecDeque;

    /// Replays a fixed list of stimuli, then repeats the last one
    struct Scripted(VecDeque<Stimulus>);

    impl Scripted {
        fn boxed(items: &[((usize, usize), &str)]) -> Box<dyn StimulusSource> {
            Box::new(Scripted(
                items.iter().map(|&(p, t)| Stimulus::new(p, t)).collect(),
            ))
        }
    }

    impl StimulusSource for Scripted {
        fn next_stimulus(&mut self, _config: &GameConfig, _lookback: Option<&Stimulus>) -> Stimulus {
            if self.0.len() > 1 {
                self.0.pop_front().unwrap()
            } else {
                self.0.front().cloned().unwrap()
            }
        }
    }

    fn two_back() -> GameConfig {
        GameConfig {
            n_level: 2,
            grid_rows: 2,
            grid_cols: 2,
            total_rounds: 10,
            string_length: 2,
            ..Default::default()
        }
    }

    fn example_engine() -> RoundEngine {
        let mut engine = RoundEngine::with_source(Scripted::boxed(&[
            ((0, 0), "AB"),
            ((1, 1), "BA"),
            ((0, 0), "CD"),
            ((0, 1), "BA"),
        ]));
        engine.start(two_back()).unwrap();
        engine
    }

    #[test]
    fn flags_follow_lookback_comparison() {
        let mut engine = example_engine();
        for _ in 0..4 {
            engine.next_stimulus().unwrap();
        }
        let flags: Vec<(bool, bool)> = engine
            .history()
            .iter()
            .map(|r| (r.position_match, r.text_match))
            .collect();
        assert_eq!(
            flags,
            vec![(false, false), (false, false), (true, false), (false, true)]
        );
    }

    #[test]
    fn claims_score_hits_and_false_alarms() {
        let mut engine = example_engine();
        engine.next_stimulus().unwrap();
        engine.next_stimulus().unwrap();
        engine.next_stimulus().unwrap();

        assert_eq!(
            engine.submit_response(ResponseKind::Position, 2).unwrap(),
            Judgement::Hit
        );
        assert_eq!(engine.score().points, 10);
        assert_eq!(
            engine.submit_response(ResponseKind::Text, 2).unwrap(),
            Judgement::FalseAlarm
        );
        assert_eq!(engine.score().points, 5);
        assert_eq!(engine.score().position.hits, 1);
        assert_eq!(engine.score().text.false_alarms, 1);
    }

    #[test]
    fn duplicate_claims_leave_score_untouched() {
        let mut engine = example_engine();
        for _ in 0..3 {
            engine.next_stimulus().unwrap();
        }
        engine.submit_response(ResponseKind::Position, 2).unwrap();
        let before = *engine.score();

        for _ in 0..3 {
            assert_matches!(
                engine.submit_response(ResponseKind::Position, 2),
                Err(Error::DuplicateResponse {
                    round: 2,
                    kind: ResponseKind::Position
                })
            );
        }
        assert_eq!(*engine.score(), before);
    }

    #[test]
    fn early_claims_are_rejected_without_scoring() {
        let mut engine = example_engine();
        engine.next_stimulus().unwrap();
        assert!(!engine.can_match());
        assert_matches!(
            engine.submit_response(ResponseKind::Text, 0),
            Err(Error::TooEarly { round: 0, depth: 2 })
        );
        assert_eq!(*engine.score(), ScoreState::default());
        assert!(!engine.is_judged(ResponseKind::Text));
    }

    #[test]
    fn claims_for_other_rounds_are_unknown() {
        let mut engine = example_engine();
        assert_matches!(
            engine.submit_response(ResponseKind::Position, 0),
            Err(Error::UnknownRound {
                round: 0,
                pending: None
            })
        );

        for _ in 0..3 {
            engine.next_stimulus().unwrap();
        }
        assert_matches!(
            engine.submit_response(ResponseKind::Position, 1),
            Err(Error::UnknownRound {
                round: 1,
                pending: Some(2)
            })
        );
        assert_matches!(
            engine.on_round_timeout(7),
            Err(Error::UnknownRound { round: 7, .. })
        );
        assert_eq!(*engine.score(), ScoreState::default());
    }

    #[test]
    fn timeout_turns_unclaimed_matches_into_misses() {
        let mut engine = example_engine();
        for _ in 0..3 {
            engine.next_stimulus().unwrap();
        }
        let closed = engine.on_round_timeout(2).unwrap();
        assert_eq!(
            closed,
            vec![
                (ResponseKind::Position, Judgement::Miss),
                (ResponseKind::Text, Judgement::CorrectRejection),
            ]
        );
        assert_eq!(engine.score().position.misses, 1);
        assert_eq!(engine.score().points, 0);

        assert!(engine.on_round_timeout(2).unwrap().is_empty());
        assert_matches!(
            engine.submit_response(ResponseKind::Position, 2),
            Err(Error::DuplicateResponse { .. })
        );
    }

    #[test]
    fn advancing_closes_the_previous_round() {
        let mut engine = example_engine();
        for _ in 0..4 {
            engine.next_stimulus().unwrap();
        }
        // round 2 held a position match nobody claimed
        assert_eq!(engine.score().position.misses, 1);
        assert_eq!(engine.current_round(), Some(3));
    }

    #[test]
    fn sequence_is_bounded_by_total_rounds() {
        let mut engine = RoundEngine::with_seed(1);
        engine.start(two_back()).unwrap();
        for _ in 0..10 {
            engine.next_stimulus().unwrap();
        }
        assert_eq!(engine.rounds_remaining(), 0);
        assert_matches!(
            engine.next_stimulus(),
            Err(Error::SequenceExhausted { total: 10 })
        );
        assert_eq!(engine.history().len(), 10);
    }

    #[test]
    fn invalid_config_creates_no_state() {
        let bad = [
            GameConfig { n_level: 0, ..two_back() },
            GameConfig { n_level: 10, ..two_back() },
            GameConfig { grid_rows: 1, grid_cols: 1, ..two_back() },
            GameConfig { total_rounds: 5, ..two_back() },
        ];
        for cfg in bad {
            let mut engine = RoundEngine::with_seed(0);
            assert_matches!(engine.start(cfg), Err(Error::Config(_)));
            assert_eq!(engine.phase(), GamePhase::Idle);
            assert!(engine.history().is_empty());
            assert_matches!(engine.next_stimulus(), Err(Error::NotRunning));
        }
    }

    #[test]
    fn failed_restart_keeps_running_game() {
        let mut engine = example_engine();
        engine.next_stimulus().unwrap();
        let bad = GameConfig {
            n_level: 10,
            ..two_back()
        };
        assert!(engine.start(bad).is_err());
        assert_eq!(engine.phase(), GamePhase::Running);
        assert_eq!(engine.rounds_played(), 1);
    }

    #[test]
    fn finish_is_idempotent_and_terminal() {
        let mut engine = example_engine();
        for _ in 0..3 {
            engine.next_stimulus().unwrap();
        }
        engine.submit_response(ResponseKind::Text, 2).unwrap();

        let first = engine.finish().unwrap();
        // the open round was closed: unclaimed position match is a miss
        assert_eq!(first.score.position.misses, 1);
        assert_eq!(first.score.text.false_alarms, 1);
        assert_eq!(first.score.points, -5);
        assert_eq!(first.rounds_played(), 3);
        assert!(!first.completed);

        let second = engine.finish().unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.phase(), GamePhase::Finished);
        assert_matches!(engine.next_stimulus(), Err(Error::NotRunning));
        assert_matches!(
            engine.submit_response(ResponseKind::Position, 2),
            Err(Error::NotRunning)
        );
    }

    #[test]
    fn finish_before_start_is_an_error() {
        let mut engine = RoundEngine::with_seed(3);
        assert_matches!(engine.finish(), Err(Error::NotRunning));
    }

    #[test]
    fn restart_after_finish_resets_everything() {
        let mut engine = example_engine();
        for _ in 0..3 {
            engine.next_stimulus().unwrap();
        }
        engine.finish().unwrap();

        engine.start(two_back()).unwrap();
        assert_eq!(engine.phase(), GamePhase::Configured);
        assert!(engine.history().is_empty());
        assert_eq!(*engine.score(), ScoreState::default());
        assert!(engine.result().is_none());
    }
}
