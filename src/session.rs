use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::config::GameConfig;
use crate::engine::RoundEngine;
use crate::error::{Error, Result};
use crate::score::{GameResult, Judgement};
use crate::stimulus::ResponseKind;

/// Display window of the current round, advanced by driver ticks
#[derive(Debug, Clone)]
pub struct RoundClock {
    duration: Duration,
    elapsed: Duration,
    paused: bool,
}

impl RoundClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: Duration::ZERO,
            paused: false,
        }
    }

    pub fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    /// Add `dt` unless paused. Returns true on the tick the window runs out.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.paused || self.is_expired() {
            return false;
        }
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.elapsed)
    }

    /// 1.0 at the start of the round, 0.0 when it expires
    pub fn fraction_remaining(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        self.remaining().as_secs_f64() / self.duration.as_secs_f64()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Message shown under the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    None,
    /// Rounds left before the first comparison is possible
    Watch(usize),
    TooEarly,
    Claimed(ResponseKind, Judgement),
    Paused,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::None => Ok(()),
            Feedback::Watch(left) => write!(f, "Watch and remember... ({left} more)"),
            Feedback::TooEarly => write!(f, "Too early!"),
            Feedback::Claimed(kind, judgement) => {
                let label = match kind {
                    ResponseKind::Position => "Position",
                    ResponseKind::Text => "Text",
                };
                let mark = if *judgement == Judgement::Hit { "✓" } else { "✗" };
                write!(f, "{label} {mark}")
            }
            Feedback::Paused => write!(f, "PAUSED - Press SPACE to resume"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Continue,
    /// A new round is on screen
    Advanced,
    Finished(GameResult),
}

/// Drives a [`RoundEngine`] from key presses and clock ticks
#[derive(Debug)]
pub struct Session {
    pub engine: RoundEngine,
    pub clock: RoundClock,
    pub feedback: Feedback,
}

impl Session {
    /// Start a game on `engine` and put the first round on screen
    pub fn start(mut engine: RoundEngine, config: GameConfig) -> Result<Self> {
        let clock = RoundClock::new(config.round_duration());
        engine.start(config)?;
        engine.next_stimulus()?;
        let mut session = Self {
            engine,
            clock,
            feedback: Feedback::None,
        };
        session.feedback = session.watch_feedback();
        Ok(session)
    }

    fn watch_feedback(&self) -> Feedback {
        let n_level = self.engine.config().map_or(0, |c| c.n_level);
        match self.engine.current_round() {
            Some(round) if round < n_level => Feedback::Watch(n_level - round),
            _ => Feedback::None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.engine.result().is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Claim a match on `kind` for the round on screen.
    ///
    /// Duplicate or stale claims are ignored; the early-round rejection is
    /// turned into feedback.
    pub fn claim(&mut self, kind: ResponseKind) -> Result<Option<Judgement>> {
        if self.is_paused() || self.is_finished() {
            return Ok(None);
        }
        let Some(round) = self.engine.current_round() else {
            return Ok(None);
        };

        match self.engine.submit_response(kind, round) {
            Ok(judgement) => {
                self.feedback = Feedback::Claimed(kind, judgement);
                Ok(Some(judgement))
            }
            Err(Error::TooEarly { .. }) => {
                self.feedback = Feedback::TooEarly;
                Ok(None)
            }
            Err(e @ (Error::DuplicateResponse { .. } | Error::UnknownRound { .. })) => {
                debug!("ignoring claim: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_finished() {
            return;
        }
        if self.clock.is_paused() {
            self.clock.resume();
            self.feedback = self.watch_feedback();
        } else {
            self.clock.pause();
            self.feedback = Feedback::Paused;
        }
    }

    /// Advance the round clock; on expiry close the round and show the next one
    pub fn on_tick(&mut self, dt: Duration) -> Result<TickOutcome> {
        if self.is_finished() || !self.clock.advance(dt) {
            return Ok(TickOutcome::Continue);
        }

        if let Some(round) = self.engine.current_round() {
            self.engine.on_round_timeout(round)?;
        }

        if self.engine.rounds_remaining() == 0 {
            return self.end().map(TickOutcome::Finished);
        }

        self.engine.next_stimulus()?;
        self.clock.restart();
        self.feedback = self.watch_feedback();
        Ok(TickOutcome::Advanced)
    }

    /// Close the game, early or not
    pub fn end(&mut self) -> Result<GameResult> {
        self.clock.pause();
        self.feedback = Feedback::None;
        self.engine.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            n_level: 2,
            round_duration_ms: 1_000,
            total_rounds: 10,
            ..Default::default()
        }
    }

    #[test]
    fn clock_expires_once() {
        let mut clock = RoundClock::new(Duration::from_millis(300));
        assert!(!clock.advance(Duration::from_millis(100)));
        assert!(!clock.advance(Duration::from_millis(100)));
        assert!(clock.advance(Duration::from_millis(150)));
        assert!(!clock.advance(Duration::from_millis(100)));
        assert_eq!(clock.remaining(), Duration::ZERO);
        assert_eq!(clock.fraction_remaining(), 0.0);
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut clock = RoundClock::new(Duration::from_millis(200));
        clock.advance(Duration::from_millis(50));
        clock.pause();
        assert!(!clock.advance(Duration::from_secs(5)));
        assert_eq!(clock.remaining(), Duration::from_millis(150));
        clock.resume();
        assert!(clock.advance(Duration::from_millis(150)));
    }

    #[test]
    fn session_shows_watch_feedback_for_early_rounds() {
        let session = Session::start(RoundEngine::with_seed(1), config()).unwrap();
        assert_eq!(session.feedback, Feedback::Watch(2));
        assert_eq!(session.feedback.to_string(), "Watch and remember... (2 more)");
    }

    #[test]
    fn early_claim_reports_too_early() {
        let mut session = Session::start(RoundEngine::with_seed(1), config()).unwrap();
        assert_eq!(session.claim(ResponseKind::Position).unwrap(), None);
        assert_eq!(session.feedback, Feedback::TooEarly);
    }

    #[test]
    fn ticks_advance_rounds_until_finished() {
        let mut session = Session::start(RoundEngine::with_seed(4), config()).unwrap();
        let tick = Duration::from_millis(250);
        let mut advanced = 0;
        let mut result = None;

        for _ in 0..200 {
            match session.on_tick(tick).unwrap() {
                TickOutcome::Continue => {}
                TickOutcome::Advanced => advanced += 1,
                TickOutcome::Finished(r) => {
                    result = Some(r);
                    break;
                }
            }
        }

        assert_eq!(advanced, 9);
        let result = result.expect("game should finish");
        assert!(result.completed);
        assert_eq!(result.rounds_played(), 10);
        // nobody pressed anything: only misses
        assert_eq!(result.score.position.hits + result.score.text.hits, 0);
        assert_eq!(result.score.points, 0);
        let expected_misses = result
            .history
            .iter()
            .filter(|r| r.position_match)
            .count() as u32;
        assert_eq!(result.score.position.misses, expected_misses);
    }

    #[test]
    fn pause_freezes_the_round() {
        let mut session = Session::start(RoundEngine::with_seed(4), config()).unwrap();
        session.toggle_pause();
        assert_eq!(session.feedback, Feedback::Paused);
        for _ in 0..20 {
            assert_eq!(session.on_tick(Duration::from_millis(500)).unwrap(), TickOutcome::Continue);
        }
        assert_eq!(session.engine.current_round(), Some(0));
        assert_eq!(session.claim(ResponseKind::Text).unwrap(), None);

        session.toggle_pause();
        assert_eq!(session.feedback, Feedback::Watch(2));
        assert_eq!(
            session.on_tick(Duration::from_millis(1_000)).unwrap(),
            TickOutcome::Advanced
        );
        assert_eq!(session.engine.current_round(), Some(1));
    }

    #[test]
    fn end_early_marks_result_incomplete() {
        let mut session = Session::start(RoundEngine::with_seed(4), config()).unwrap();
        session.on_tick(Duration::from_millis(1_000)).unwrap();
        let result = session.end().unwrap();
        assert!(!result.completed);
        assert_eq!(result.rounds_played(), 2);
        assert!(session.is_finished());
        assert_eq!(session.on_tick(Duration::from_secs(1)).unwrap(), TickOutcome::Continue);
    }

    #[test]
    fn feedback_marks_claim_outcome() {
        assert_eq!(
            Feedback::Claimed(ResponseKind::Position, Judgement::Hit).to_string(),
            "Position ✓"
        );
        assert_eq!(
            Feedback::Claimed(ResponseKind::Text, Judgement::FalseAlarm).to_string(),
            "Text ✗"
        );
    }
}
