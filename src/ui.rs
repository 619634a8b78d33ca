use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};

use typewise::{session::SessionResult, tracker::CharState, SessionStatus};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.state, &self.result) {
            (AppState::Results, Some(result)) => render_results(self, result, area, buf),
            _ => render_typing(self, area, buf),
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = Style::default()
        .patch(dim_bold_style)
        .add_modifier(Modifier::UNDERLINED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let target = app.controller.target();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_lines = if target.len() <= max_chars_per_line as usize {
        1
    } else {
        ((target.len() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(prompt_lines + 4) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(2), // hud
            Constraint::Length(prompt_lines),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    if let Some(stats) = app.controller.live_stats() {
        let mut hud = vec![
            Span::styled(format!("{:.0} wpm", stats.live_wpm), bold_style),
            Span::raw("   "),
            Span::styled(format!("{}% acc", stats.accuracy), bold_style),
        ];
        if let Some(remaining) = stats.remaining_secs {
            hud.push(Span::raw("   "));
            hud.push(Span::styled(format!("{:.1}s", remaining), dim_bold_style));
        } else {
            hud.push(Span::raw("   "));
            hud.push(Span::styled(
                format!("{:.0}%", stats.progress_percent),
                dim_bold_style,
            ));
        }
        Paragraph::new(Line::from(hud))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }

    if app.is_paused() {
        Paragraph::new(Span::styled(
            "PAUSED - press tab to resume",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);
    } else {
        let caret = app.controller.caret();
        let spans = target
            .iter()
            .zip(app.controller.states())
            .enumerate()
            .map(|(idx, (&expected, state))| match state {
                CharState::Correct => Span::styled(expected.to_string(), green_bold_style),
                CharState::Incorrect => Span::styled(
                    match expected {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                ),
                CharState::Untyped if idx == caret => {
                    Span::styled(expected.to_string(), underlined_dim_bold_style)
                }
                CharState::Untyped => Span::styled(expected.to_string(), dim_bold_style),
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if prompt_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
    }

    let legend = match app.controller.status() {
        Some(SessionStatus::Idle) => "start typing / (esc)ape",
        _ => "(tab) pause / (esc) stop",
    };
    Paragraph::new(Span::styled(legend, italic_style)).render(chunks[4], buf);
}

fn render_results(app: &App, result: &SessionResult, area: Rect, buf: &mut Buffer) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);
    let magenta_style = Style::default().fg(Color::Magenta);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // weakest keys
            Constraint::Length(1), // recent runs
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points = sample_points(&result.wpm_samples);
    let (overall_duration, highest_wpm) = compute_chart_params(&points, result.elapsed_secs);
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(magenta_style)
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold_style),
                    Span::styled(format_label(overall_duration), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, highest_wpm])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(format_label(highest_wpm), bold_style),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} wpm   {} raw   {}% acc   {}% consistency   {:.1}s",
            result.net_wpm,
            result.gross_wpm,
            result.accuracy,
            result.consistency,
            result.elapsed_secs
        ),
        bold_style,
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        weakest_keys_line(result, app.best_wpm),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    if let Some(line) = recent_runs_line(&app.recent) {
        Paragraph::new(Span::styled(line, italic_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }

    Paragraph::new(Span::styled("(r)etry / (n)ew / (esc)ape", italic_style))
        .render(chunks[4], buf);
}

/// Per-second samples as chart points starting at second 1
fn sample_points(samples: &[f64]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .enumerate()
        .map(|(i, wpm)| ((i + 1) as f64, *wpm))
        .collect()
}

/// X (seconds) and Y (WPM) bounds for the results chart
fn compute_chart_params(points: &[(f64, f64)], elapsed_secs: f64) -> (f64, f64) {
    let highest_wpm = points.iter().map(|p| p.1).fold(0.0, f64::max);
    let overall_duration = points.last().map_or(elapsed_secs, |p| p.0).max(1.0);

    (overall_duration, highest_wpm.round())
}

fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

fn weakest_keys_line(result: &SessionResult, best_wpm: Option<u32>) -> String {
    let weakest = result.weakest_keys(5);
    let keys = if weakest.is_empty() {
        "no missed keys".to_string()
    } else {
        let listed = weakest
            .iter()
            .map(|(k, n)| format!("{k}×{n}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("missed: {listed}")
    };

    match best_wpm {
        Some(best) => format!("{keys}   best {best} wpm"),
        None => keys,
    }
}

fn recent_runs_line(recent: &[u32]) -> Option<String> {
    if recent.is_empty() {
        return None;
    }
    let runs = recent.iter().map(|wpm| wpm.to_string()).collect::<Vec<_>>();
    Some(format!("recent: {}", runs.join(" ")))
}
