use std::time::Duration;

use tracing::warn;

use crate::config::GameConfig;
use crate::engine::RoundEngine;
use crate::error::Result;
use crate::runtime::Command;
use crate::score::GameResult;
use crate::session::{Session, TickOutcome};
use crate::stats::{GameRecord, RecordOutcome, StatsDb};

pub const RECENT_GAMES: usize = 20;
pub const CHART_GAMES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Playing,
    Results,
    History,
}

/// Stored statistics loaded for the results and history screens
#[derive(Debug, Clone, Default)]
pub struct StatsView {
    pub high_scores: Vec<(usize, i64)>,
    pub recent: Vec<GameRecord>,
    /// scores at the current level, oldest first
    pub level_scores: Vec<i64>,
}

#[derive(Debug)]
pub struct App {
    pub config: GameConfig,
    pub seed: Option<u64>,
    pub session: Session,
    pub state: AppState,
    pub stats_db: Option<StatsDb>,
    pub last_result: Option<GameResult>,
    pub last_record: Option<RecordOutcome>,
    pub stats_view: StatsView,
    pub should_quit: bool,
    games_started: u64,
}

impl App {
    pub fn new(config: GameConfig, seed: Option<u64>, stats_db: Option<StatsDb>) -> Result<Self> {
        let session = Session::start(Self::engine_for(seed, 0), config.clone())?;
        Ok(Self {
            config,
            seed,
            session,
            state: AppState::Playing,
            stats_db,
            last_result: None,
            last_record: None,
            stats_view: StatsView::default(),
            should_quit: false,
            games_started: 1,
        })
    }

    fn engine_for(seed: Option<u64>, game: u64) -> RoundEngine {
        match seed {
            // each replay gets its own sequence, reproducible from the seed
            Some(seed) => RoundEngine::with_seed(seed.wrapping_add(game)),
            None => RoundEngine::new(),
        }
    }

    pub fn restart(&mut self) -> Result<()> {
        let engine = Self::engine_for(self.seed, self.games_started);
        self.session = Session::start(engine, self.config.clone())?;
        self.games_started += 1;
        self.state = AppState::Playing;
        self.last_result = None;
        self.last_record = None;
        Ok(())
    }

    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        match (self.state, command) {
            (_, Command::Quit) => self.should_quit = true,

            (AppState::Playing, Command::Claim(kind)) => {
                self.session.claim(kind)?;
            }
            (AppState::Playing, Command::TogglePause) => self.session.toggle_pause(),
            (AppState::Playing, Command::End) => {
                let result = self.session.end()?;
                self.complete_game(result);
            }
            (AppState::Playing, _) => {}

            (AppState::Results | AppState::History, Command::Restart) => self.restart()?,
            (AppState::Results, Command::History) => {
                self.refresh_stats();
                self.state = AppState::History;
            }
            (AppState::History, Command::Back) => self.state = AppState::Results,
            (AppState::Results | AppState::History, Command::End) => self.should_quit = true,
            (AppState::Results | AppState::History, _) => {}
        }
        Ok(())
    }

    /// Advance the round clock by `dt` while a game is on screen
    pub fn on_tick(&mut self, dt: Duration) -> Result<()> {
        if self.state != AppState::Playing {
            return Ok(());
        }
        if let TickOutcome::Finished(result) = self.session.on_tick(dt)? {
            self.complete_game(result);
        }
        Ok(())
    }

    fn complete_game(&mut self, result: GameResult) {
        self.last_record = match self.stats_db.as_mut() {
            Some(db) => match db.record_game(&result) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    warn!("failed to record game: {}", e);
                    None
                }
            },
            None => None,
        };
        self.last_result = Some(result);
        self.refresh_stats();
        self.state = AppState::Results;
    }

    fn refresh_stats(&mut self) {
        let Some(db) = self.stats_db.as_ref() else {
            return;
        };
        let loaded = (|| -> Result<StatsView> {
            Ok(StatsView {
                high_scores: db.high_scores()?,
                recent: db.recent_games(RECENT_GAMES)?,
                level_scores: db.level_scores(self.config.n_level, CHART_GAMES)?,
            })
        })();
        match loaded {
            Ok(view) => self.stats_view = view,
            Err(e) => warn!("failed to load statistics: {}", e),
        }
    }

    /// High score at the current level, from the last recorded game or the store
    pub fn high_score(&self) -> Option<i64> {
        self.last_record.map(|r| r.high_score).or_else(|| {
            self.stats_view
                .high_scores
                .iter()
                .find(|(level, _)| *level == self.config.n_level)
                .map(|(_, score)| *score)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::ResponseKind;

    fn quick_config() -> GameConfig {
        GameConfig {
            n_level: 1,
            round_duration_ms: 1_000,
            total_rounds: 10,
            ..Default::default()
        }
    }

    fn play_out(app: &mut App) {
        for _ in 0..100 {
            app.on_tick(Duration::from_millis(1_000)).unwrap();
            if app.state != AppState::Playing {
                break;
            }
        }
    }

    #[test]
    fn finished_game_is_recorded_and_shown() {
        let db = StatsDb::open_in_memory().unwrap();
        let mut app = App::new(quick_config(), Some(9), Some(db)).unwrap();
        play_out(&mut app);

        assert_eq!(app.state, AppState::Results);
        let result = app.last_result.as_ref().unwrap();
        assert!(result.completed);
        assert_eq!(app.last_record.unwrap().high_score, result.display_score());
        assert_eq!(app.stats_view.recent.len(), 1);
        assert_eq!(app.stats_view.level_scores, vec![result.display_score()]);
        assert_eq!(app.high_score(), Some(result.display_score()));
    }

    #[test]
    fn end_command_closes_game_early() {
        let mut app = App::new(quick_config(), Some(2), None).unwrap();
        app.on_tick(Duration::from_millis(1_000)).unwrap();
        app.handle_command(Command::End).unwrap();

        assert_eq!(app.state, AppState::Results);
        assert!(!app.last_result.as_ref().unwrap().completed);
        assert!(app.last_record.is_none());
    }

    #[test]
    fn claims_only_count_while_playing() {
        let mut app = App::new(quick_config(), Some(2), None).unwrap();
        app.on_tick(Duration::from_millis(1_000)).unwrap();
        app.handle_command(Command::Claim(ResponseKind::Position))
            .unwrap();
        let judged = app.session.engine.score().position.attempts();
        assert_eq!(judged, 1);

        app.handle_command(Command::End).unwrap();
        app.handle_command(Command::Claim(ResponseKind::Position))
            .unwrap();
        assert_eq!(app.state, AppState::Results);
    }

    #[test]
    fn results_navigation() {
        let db = StatsDb::open_in_memory().unwrap();
        let mut app = App::new(quick_config(), Some(5), Some(db)).unwrap();
        play_out(&mut app);

        app.handle_command(Command::History).unwrap();
        assert_eq!(app.state, AppState::History);
        app.handle_command(Command::Back).unwrap();
        assert_eq!(app.state, AppState::Results);

        app.handle_command(Command::Restart).unwrap();
        assert_eq!(app.state, AppState::Playing);
        assert_eq!(app.session.engine.rounds_played(), 1);
        assert!(app.last_result.is_none());

        app.handle_command(Command::Quit).unwrap();
        assert!(app.should_quit);
    }
}
