use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};

use crate::{app::App, stats::GameRecord};

fn accuracy_color(percent: f64) -> Color {
    if percent >= 80.0 {
        Color::Green
    } else if percent >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Pure presenter for one row of the recent games table
pub fn present_row(record: &GameRecord) -> Row<'static> {
    let level = if record.completed {
        format!("{}-Back", record.n_level)
    } else {
        format!("{}-Back *", record.n_level)
    };

    Row::new(vec![
        Cell::from(record.played_at.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(level).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(record.grid.clone()),
        Cell::from(format!("{}/{}", record.rounds_played, record.rounds)),
        Cell::from(record.score.to_string()),
        Cell::from(format!("{:.1}%", record.position_accuracy))
            .style(Style::default().fg(accuracy_color(record.position_accuracy))),
        Cell::from(format!("{:.1}%", record.text_accuracy))
            .style(Style::default().fg(accuracy_color(record.text_accuracy))),
    ])
}

/// Render high scores per level above the recent games log
pub fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // high scores
            Constraint::Min(0),    // games table
            Constraint::Length(2), // instructions
        ])
        .split(area);

    let view = &app.stats_view;

    let high_scores = if view.high_scores.is_empty() {
        "No games recorded yet".to_string()
    } else {
        view.high_scores
            .iter()
            .map(|(level, score)| format!("{level}-Back: {score}"))
            .join("   ")
    };
    Paragraph::new(high_scores)
        .block(Block::default().borders(Borders::ALL).title("High Scores"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    if view.recent.is_empty() {
        Paragraph::new("Finish a game to start the history log.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .render(chunks[1], buf);
    } else {
        let header = Row::new(vec![
            "Played", "Level", "Grid", "Rounds", "Score", "Position", "Text",
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let rows: Vec<Row> = view.recent.iter().take(visible).map(present_row).collect();

        let widths = [
            Constraint::Length(16), // Played
            Constraint::Length(9),  // Level
            Constraint::Length(5),  // Grid
            Constraint::Length(7),  // Rounds
            Constraint::Length(6),  // Score
            Constraint::Length(9),  // Position
            Constraint::Min(7),     // Text
        ];

        Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Recent Games"))
            .column_spacing(1)
            .render(chunks[1], buf);
    }

    Paragraph::new("(b/backspace) back  (r) play again  (esc) quit    * ended early")
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::config::GameConfig;
    use crate::runtime::Command;
    use crate::stats::StatsDb;
    use chrono::{Local, TimeZone};
    use std::time::Duration;

    fn record(completed: bool) -> GameRecord {
        GameRecord {
            played_at: Local.with_ymd_and_hms(2024, 3, 9, 18, 5, 0).unwrap(),
            n_level: 3,
            grid: "4x4".to_string(),
            rounds: 25,
            rounds_played: if completed { 25 } else { 7 },
            score: 85,
            position_accuracy: 90.0,
            text_accuracy: 42.5,
            completed,
        }
    }

    fn rendered_rows(records: &[GameRecord]) -> Vec<String> {
        let rows: Vec<Row> = records.iter().map(present_row).collect();
        let widths = [
            Constraint::Length(16),
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Length(7),
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Min(7),
        ];
        let area = Rect::new(0, 0, 80, records.len() as u16);
        let mut buf = Buffer::empty(area);
        Table::new(rows, widths).column_spacing(1).render(area, &mut buf);

        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn present_row_shows_every_column() {
        let lines = rendered_rows(&[record(true), record(false)]);

        assert!(lines[0].contains("2024-03-09 18:05"));
        assert!(lines[0].contains("3-Back "));
        assert!(!lines[0].contains('*'));
        assert!(lines[0].contains("4x4"));
        assert!(lines[0].contains("25/25"));
        assert!(lines[0].contains("85"));
        assert!(lines[0].contains("90.0%"));
        assert!(lines[0].contains("42.5%"));

        assert!(lines[1].contains("3-Back *"));
        assert!(lines[1].contains("7/25"));
        assert!(lines[1].contains("42.5%"));
    }

    #[test]
    fn accuracy_colors() {
        assert_eq!(accuracy_color(95.0), Color::Green);
        assert_eq!(accuracy_color(50.0), Color::Yellow);
        assert_eq!(accuracy_color(10.0), Color::Red);
    }

    #[test]
    fn history_screen_lists_recorded_games() {
        let config = GameConfig {
            n_level: 1,
            round_duration_ms: 1_000,
            total_rounds: 10,
            ..Default::default()
        };
        let db = StatsDb::open_in_memory().unwrap();
        let mut app = App::new(config, Some(11), Some(db)).unwrap();
        for _ in 0..20 {
            app.on_tick(Duration::from_millis(1_000)).unwrap();
        }
        app.handle_command(Command::History).unwrap();
        assert_eq!(app.state, AppState::History);

        let area = Rect::new(0, 0, 100, 24);
        let mut buf = Buffer::empty(area);
        render_history(&app, area, &mut buf);
        let content: String = buf.content().iter().map(|c| c.symbol()).collect();

        assert!(content.contains("1-Back:"));
        assert!(content.contains("Recent Games"));
        assert!(content.contains("10/10"));
    }

    #[test]
    fn empty_history_shows_hint() {
        let app = App::new(GameConfig::default(), Some(1), None).unwrap();
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        render_history(&app, area, &mut buf);
        let content: String = buf.content().iter().map(|c| c.symbol()).collect();
        assert!(content.contains("No games recorded yet"));
    }
}
