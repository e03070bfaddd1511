use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::config::GameConfig;
use crate::stimulus::{random_text, Position, ResponseKind, Stimulus};

/// Share of matchable rounds that should carry a match, per channel
pub const TARGET_MATCH_RATE: f64 = 0.25;
/// Match probability used until enough rounds have been observed to adapt
pub const BASE_MATCH_PROBABILITY: f64 = 0.25;
/// Longest allowed run of forced matches on one channel, and of rounds with no match at all
pub const MAX_STREAK: u32 = 4;
/// Chance that a non-match is drawn close to the n-back stimulus
pub const LURE_PROBABILITY: f64 = 0.15;

const ADAPT_AFTER_ROUNDS: u32 = 3;
const ADAPT_SCALE: f64 = 2.0;
const MIN_MATCH_PROBABILITY: f64 = 0.1;
const MAX_MATCH_PROBABILITY: f64 = 0.5;
const BREAK_DRY_SPELL_PROBABILITY: f64 = 0.6;

const NEIGHBOUR_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

/// Produces the stimulus for each round.
///
/// `lookback` is the stimulus shown `n_level` rounds earlier, or `None` while
/// the history is still shorter than the lookback depth. The engine derives
/// the match flags itself, so a source is free to produce any stimulus.
pub trait StimulusSource {
    fn next_stimulus(&mut self, config: &GameConfig, lookback: Option<&Stimulus>) -> Stimulus;

    /// Called when a new game starts
    fn reset(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
struct ChannelState {
    matches: u32,
    streak: u32,
}

/// Adaptive generator that keeps the match rate near `TARGET_MATCH_RATE`.
///
/// Each channel independently decides whether to repeat the n-back value.
/// The decision probability drifts toward the target as the game goes on,
/// runs of matches are capped, and long dry spells are broken up. A
/// non-match is always different from the n-back value, and is sometimes a
/// lure: an adjacent cell or text that differs in a single character.
#[derive(Debug)]
pub struct FairGenerator {
    rng: StdRng,
    position: ChannelState,
    text: ChannelState,
    dual_matches: u32,
    matchable_rounds: u32,
    no_match_streak: u32,
}

impl FairGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            position: ChannelState::default(),
            text: ChannelState::default(),
            dual_matches: 0,
            matchable_rounds: 0,
            no_match_streak: 0,
        }
    }

    /// Observed (position, text, dual) match rates over matchable rounds
    pub fn match_rates(&self) -> (f64, f64, f64) {
        if self.matchable_rounds == 0 {
            return (0.0, 0.0, 0.0);
        }
        let rounds = self.matchable_rounds as f64;
        (
            self.position.matches as f64 / rounds,
            self.text.matches as f64 / rounds,
            self.dual_matches as f64 / rounds,
        )
    }

    fn channel(&self, kind: ResponseKind) -> &ChannelState {
        match kind {
            ResponseKind::Position => &self.position,
            ResponseKind::Text => &self.text,
        }
    }

    fn channel_mut(&mut self, kind: ResponseKind) -> &mut ChannelState {
        match kind {
            ResponseKind::Position => &mut self.position,
            ResponseKind::Text => &mut self.text,
        }
    }

    fn match_probability(&self, kind: ResponseKind) -> f64 {
        if self.matchable_rounds < ADAPT_AFTER_ROUNDS {
            return BASE_MATCH_PROBABILITY;
        }
        let observed = self.channel(kind).matches as f64 / self.matchable_rounds as f64;
        let adjusted = BASE_MATCH_PROBABILITY + (TARGET_MATCH_RATE - observed) * ADAPT_SCALE;
        adjusted.clamp(MIN_MATCH_PROBABILITY, MAX_MATCH_PROBABILITY)
    }

    fn decide_match(&mut self, kind: ResponseKind) -> bool {
        if self.no_match_streak >= MAX_STREAK {
            return self.rng.gen_bool(BREAK_DRY_SPELL_PROBABILITY);
        }
        if self.channel(kind).streak >= MAX_STREAK {
            return false;
        }
        let p = self.match_probability(kind);
        self.rng.gen_bool(p)
    }

    fn record(&mut self, kind: ResponseKind, matched: bool) {
        let channel = self.channel_mut(kind);
        if matched {
            channel.matches += 1;
            channel.streak += 1;
        } else {
            channel.streak = 0;
        }
    }

    fn random_position(&mut self, config: &GameConfig) -> Position {
        Position::new(
            self.rng.gen_range(0..config.grid_rows),
            self.rng.gen_range(0..config.grid_cols),
        )
    }

    fn position_other_than(&mut self, config: &GameConfig, avoid: Position) -> Position {
        let cells: Vec<Position> = (0..config.grid_rows)
            .flat_map(|row| (0..config.grid_cols).map(move |col| Position::new(row, col)))
            .filter(|p| *p != avoid)
            .collect();
        cells
            .choose(&mut self.rng)
            .copied()
            .unwrap_or_else(|| self.random_position(config))
    }

    fn position_lure(&mut self, config: &GameConfig, near: Position) -> Position {
        let mut offsets = NEIGHBOUR_OFFSETS;
        offsets.shuffle(&mut self.rng);
        offsets
            .iter()
            .filter_map(|&(dr, dc)| {
                let row = near.row.checked_add_signed(dr)?;
                let col = near.col.checked_add_signed(dc)?;
                (row < config.grid_rows && col < config.grid_cols).then(|| Position::new(row, col))
            })
            .next()
            .unwrap_or_else(|| self.position_other_than(config, near))
    }

    /// Replace one character of `text` with a different character from `pool`
    fn perturb_text(&mut self, pool: &[char], text: &str) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return text.to_string();
        }
        let idx = self.rng.gen_range(0..chars.len());
        let original = chars[idx];
        let alternatives: Vec<char> = pool.iter().copied().filter(|c| *c != original).collect();
        if let Some(c) = alternatives.choose(&mut self.rng) {
            chars[idx] = *c;
        }
        chars.into_iter().collect()
    }

    fn text_other_than(&mut self, config: &GameConfig, pool: &[char], avoid: &str) -> String {
        let text = random_text(&mut self.rng, pool, config.string_length);
        if text == avoid {
            self.perturb_text(pool, &text)
        } else {
            text
        }
    }
}

impl Default for FairGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StimulusSource for FairGenerator {
    fn next_stimulus(&mut self, config: &GameConfig, lookback: Option<&Stimulus>) -> Stimulus {
        let pool = config.char_pool();

        let Some(n_back) = lookback else {
            let position = self.random_position(config);
            let text = random_text(&mut self.rng, &pool, config.string_length);
            return Stimulus { position, text };
        };

        self.matchable_rounds += 1;

        let position_match = self.decide_match(ResponseKind::Position);
        let text_match = self.decide_match(ResponseKind::Text);
        let lure = self.rng.gen_bool(LURE_PROBABILITY);

        let position = if position_match {
            n_back.position
        } else if lure {
            self.position_lure(config, n_back.position)
        } else {
            self.position_other_than(config, n_back.position)
        };

        let text = if text_match {
            n_back.text.clone()
        } else if lure {
            self.perturb_text(&pool, &n_back.text)
        } else {
            self.text_other_than(config, &pool, &n_back.text)
        };

        self.record(ResponseKind::Position, position_match);
        self.record(ResponseKind::Text, text_match);
        if position_match && text_match {
            self.dual_matches += 1;
        }
        if position_match || text_match {
            self.no_match_streak = 0;
        } else {
            self.no_match_streak += 1;
        }

        Stimulus { position, text }
    }

    fn reset(&mut self) {
        self.position = ChannelState::default();
        self.text = ChannelState::default();
        self.dual_matches = 0;
        self.matchable_rounds = 0;
        self.no_match_streak = 0;
    }
}
