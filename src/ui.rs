pub mod charting;
pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, Gauge, GraphType, Paragraph, Row, Table,
        Widget, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppState},
    score::{GameResult, Judgement},
    session::Feedback,
    stimulus::ResponseKind,
    util::score_trend,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const CELL_WIDTH: u16 = 7;
const CELL_HEIGHT: u16 = 3;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Playing => render_game(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            AppState::History => history::render_history(self, area, buf),
        }
    }
}

fn render_game(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let session = &app.session;
    let engine = &session.engine;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // round / level / score
            Constraint::Min(CELL_HEIGHT * 2),
            Constraint::Length(3), // text stimulus
            Constraint::Length(1), // round timer
            Constraint::Length(1), // feedback
            Constraint::Length(1), // live counts
            Constraint::Length(1), // legend
        ])
        .split(area);

    let header = Paragraph::new(Span::styled(
        format!(
            "Round {}/{}   {}-Back   Score: {}",
            engine.current_round().map_or(0, |r| r + 1),
            app.config.total_rounds,
            app.config.n_level,
            engine.score().points.max(0)
        ),
        bold_style,
    ))
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    let active = engine.current_stimulus().map(|s| s.position);
    render_grid(
        app.config.grid_rows,
        app.config.grid_cols,
        active.map(|p| (p.row, p.col)),
        chunks[1],
        buf,
    );

    let text = engine
        .current_stimulus()
        .map(|s| s.text.clone())
        .unwrap_or_default();
    let text_width = (text.width() as u16 + 4).clamp(8, chunks[2].width.max(8));
    let text_area = centered(chunks[2], text_width, chunks[2].height);
    Paragraph::new(Span::styled(
        text,
        bold_style.fg(Color::LightGreen),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
    .render(text_area, buf);

    let (timer_style, label) = if session.is_paused() {
        (Style::default().fg(Color::Yellow), "paused".to_string())
    } else {
        (
            Style::default().fg(Color::Green),
            format!("{:.1}s", session.clock.remaining().as_secs_f64()),
        )
    };
    Gauge::default()
        .gauge_style(timer_style)
        .ratio(session.clock.fraction_remaining().clamp(0.0, 1.0))
        .label(label)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        session.feedback.to_string(),
        feedback_style(session.feedback),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);

    let score = engine.score();
    let pressed = |kind: ResponseKind| if engine.is_judged(kind) { "●" } else { "○" };
    Paragraph::new(Line::from(vec![
        Span::styled(
            format!(
                "{} Position  hits {}  miss {}",
                pressed(ResponseKind::Position),
                score.position.hits,
                score.position.misses
            ),
            dim_style,
        ),
        Span::raw("    "),
        Span::styled(
            format!(
                "{} Text  hits {}  miss {}",
                pressed(ResponseKind::Text),
                score.text.hits,
                score.text.misses
            ),
            dim_style,
        ),
    ]))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);

    Paragraph::new(Span::styled(
        "(a) position match   (l) text match   (space) pause   (esc) end game",
        italic_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[6], buf);
}

fn feedback_style(feedback: Feedback) -> Style {
    match feedback {
        Feedback::Claimed(_, Judgement::Hit) => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        Feedback::Claimed(_, _) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Feedback::TooEarly | Feedback::Paused => Style::default().fg(Color::Yellow),
        Feedback::Watch(_) | Feedback::None => Style::default().add_modifier(Modifier::DIM),
    }
}

/// Rect of `width` x `height` centered in `area`, clipped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_grid(rows: usize, cols: usize, active: Option<(usize, usize)>, area: Rect, buf: &mut Buffer) {
    let grid = centered(
        area,
        CELL_WIDTH * cols as u16,
        CELL_HEIGHT * rows as u16,
    );
    let cell_style = Style::default().fg(Color::DarkGray);
    let active_style = Style::default().bg(Color::Green).fg(Color::Green);

    for row in 0..rows {
        for col in 0..cols {
            let cell = Rect::new(
                grid.x + col as u16 * CELL_WIDTH,
                grid.y + row as u16 * CELL_HEIGHT,
                CELL_WIDTH,
                CELL_HEIGHT,
            )
            .intersection(grid);
            if cell.width == 0 || cell.height == 0 {
                continue;
            }
            let style = if active == Some((row, col)) {
                active_style
            } else {
                cell_style
            };
            Block::default()
                .borders(Borders::ALL)
                .style(style)
                .render(cell, buf);
        }
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(result) = app.last_result.as_ref() else {
        return;
    };
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // final score
            Constraint::Length(1), // high score
            Constraint::Length(6), // per-kind table
            Constraint::Min(1),    // score chart
            Constraint::Length(1), // trend
            Constraint::Length(1), // legend
        ])
        .split(area);

    let title = if result.completed {
        " Final Score "
    } else {
        " Final Score (ended early) "
    };
    Paragraph::new(Span::styled(
        format!("{} points", result.display_score()),
        bold_style.fg(Color::LightGreen),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(title))
    .render(chunks[0], buf);

    let high_score_line = match (app.last_record, app.high_score()) {
        (Some(record), _) if record.is_high_score => Span::styled(
            "NEW HIGH SCORE!",
            bold_style.fg(Color::Yellow),
        ),
        (_, Some(high)) => Span::styled(
            format!("High score at {}-Back: {}", result.config.n_level, high),
            Style::default().fg(Color::Gray),
        ),
        (_, None) => Span::raw(""),
    };
    Paragraph::new(high_score_line)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    result_table(result).render(chunks[2], buf);

    let points = charting::score_points(&app.stats_view.level_scores);
    if points.len() > 1 {
        let (games, highest) = charting::compute_chart_params(&points);
        let datasets = vec![Dataset::default()
            .marker(ratatui::symbols::Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("game")
                    .bounds([1.0, games])
                    .labels(vec![
                        Span::styled("1", bold_style),
                        Span::styled(charting::format_label(games), bold_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("score")
                    .bounds([0.0, highest])
                    .labels(vec![
                        Span::styled("0", bold_style),
                        Span::styled(charting::format_label(highest), bold_style),
                    ]),
            )
            .render(chunks[3], buf);
    }

    if let Some(trend) = score_trend(&app.stats_view.level_scores) {
        let delta = trend
            .last_delta
            .map(|d| format!("   last vs earlier {d:+.1}"))
            .unwrap_or_default();
        Paragraph::new(Span::styled(
            format!(
                "{} games at {}-Back   avg {:.1} ± {:.1}   best {}{}",
                trend.games, result.config.n_level, trend.mean, trend.std_dev, trend.best, delta
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(
        "(r) play again / (h) history / (esc) quit",
        italic_style,
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[5], buf);
}

fn result_table(result: &GameResult) -> Table<'static> {
    let row = |label: &'static str, f: &dyn Fn(ResponseKind) -> String| {
        Row::new(vec![
            Cell::from(label),
            Cell::from(f(ResponseKind::Position)),
            Cell::from(f(ResponseKind::Text)),
        ])
    };
    let tally = |kind: ResponseKind| *result.score.tally(kind);

    let rows = vec![
        row("Accuracy", &|k| format!("{:.1}%", result.accuracy_percent(k))),
        row("Correct", &|k| tally(k).hits.to_string()),
        row("Missed", &|k| tally(k).misses.to_string()),
        row("False alarms", &|k| tally(k).false_alarms.to_string()),
    ];

    Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["", "Position", "Text"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .column_spacing(2)
}
