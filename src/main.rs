use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use dualback::{
    app::{App, RECENT_GAMES},
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore, GameConfig, Preset},
    runtime::{Command, CrosstermEventSource, FixedTicker, GameEvent, Runner},
    stats::StatsDb,
    stimulus::{CharSet, LetterCase},
    ui::screen::current_screen,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    sync::Mutex,
    time::Duration,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// dual n-back working memory trainer
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Dual n-back in the terminal: watch a cell light up on a grid while a short string is shown, and flag when either matches the one from N rounds back. Scores are kept per level."
)]
pub struct Cli {
    /// how many rounds back a match refers to (1-9)
    #[clap(short = 'n', long)]
    n_level: Option<usize>,

    /// grid rows (2-6)
    #[clap(long)]
    rows: Option<usize>,

    /// grid columns (2-6)
    #[clap(long)]
    cols: Option<usize>,

    /// milliseconds each round is shown (1000-10000)
    #[clap(short = 'd', long)]
    duration_ms: Option<u64>,

    /// rounds per game (10-100)
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// characters in each text stimulus (1-6)
    #[clap(short = 'l', long)]
    length: Option<usize>,

    /// characters the text stimulus is drawn from
    #[clap(long, value_enum)]
    charset: Option<CharSet>,

    /// letter case for text stimuli
    #[clap(long, value_enum)]
    case: Option<LetterCase>,

    /// difficulty preset setting n-level and rounds; explicit -n / -r still win
    #[clap(long, value_enum)]
    preset: Option<Preset>,

    /// seed the stimulus generator for a reproducible game
    #[clap(long)]
    seed: Option<u64>,

    /// store the resulting settings as the new defaults
    #[clap(long)]
    save_config: bool,

    /// print high scores and recent games, then exit
    #[clap(long)]
    stats: bool,
}

impl Cli {
    /// Layer the flags over `base` (the stored settings)
    fn resolve(&self, base: GameConfig) -> GameConfig {
        let mut cfg = base;
        if let Some(preset) = self.preset {
            cfg.apply_preset(preset);
        }
        if let Some(n) = self.n_level {
            cfg.n_level = n;
        }
        if let Some(rows) = self.rows {
            cfg.grid_rows = rows;
        }
        if let Some(cols) = self.cols {
            cfg.grid_cols = cols;
        }
        if let Some(ms) = self.duration_ms {
            cfg.round_duration_ms = ms;
        }
        if let Some(rounds) = self.rounds {
            cfg.total_rounds = rounds;
        }
        if let Some(length) = self.length {
            cfg.string_length = length;
        }
        if let Some(charset) = self.charset {
            cfg.charset = charset;
        }
        if let Some(case) = self.case {
            cfg.letter_case = case;
        }
        cfg
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let path = AppDirs::log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dualback=info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn write_stats<W: Write>(out: &mut W, db: &StatsDb) -> Result<(), Box<dyn Error>> {
    let high_scores = db.high_scores()?;
    writeln!(out, "High scores")?;
    if high_scores.is_empty() {
        writeln!(out, "  none yet")?;
    }
    for (level, score) in high_scores {
        writeln!(out, "  {level}-Back  {score:>5}")?;
    }

    writeln!(out)?;
    writeln!(out, "Recent games")?;
    for game in db.recent_games(RECENT_GAMES)? {
        writeln!(
            out,
            "  {}  {}-Back  {:<4} {:>3}/{:<3} {:>5}  pos {:>5.1}%  text {:>5.1}%{}",
            game.played_at.format("%Y-%m-%d %H:%M"),
            game.n_level,
            game.grid,
            game.rounds_played,
            game.rounds,
            game.score,
            game.position_accuracy,
            game.text_accuracy,
            if game.completed { "" } else { "  (ended early)" },
        )?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("logging disabled: {e}");
    }

    let store = FileConfigStore::new();
    let config = cli.resolve(store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e).exit();
    }

    if cli.save_config {
        store.save(&config)?;
        info!("saved settings to {:?}", store.path());
    }

    if cli.stats {
        let db = StatsDb::new()?;
        write_stats(&mut io::stdout().lock(), &db)?;
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let stats_db = match StatsDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("statistics unavailable, games will not be recorded: {}", e);
            None
        }
    };
    let mut app = App::new(config, cli.seed, stats_db)?;

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    terminal.draw(|f| current_screen(&app.state).render(app, f))?;

    while !app.should_quit {
        let (event, elapsed) = runner.step_timed();

        // the clock catches up before a key is judged against the current round
        app.on_tick(elapsed)?;
        if let GameEvent::Key(key) = event {
            if let Some(command) = Command::from_key(key) {
                app.handle_command(command)?;
            }
        }

        terminal.draw(|f| current_screen(&app.state).render(app, f))?;
    }

    Ok(())
}
