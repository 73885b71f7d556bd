use docwave::page::Theme;
use docwave::panels::Panel;
use docwave::plugin::HandleFactory;
use docwave::widget::{Control, Player};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use super::app::{App, FrameDriven};
use super::waveform;

/// `#rgb` / `#rrggbb` to a terminal colour
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some(Color::Rgb(digits.next()??, digits.next()??, digits.next()??))
        }
        6 => Some(Color::Rgb(
            channel(hex.get(0..2)?)?,
            channel(hex.get(2..4)?)?,
            channel(hex.get(4..6)?)?,
        )),
        _ => None,
    }
}

fn theme_colors(theme: &Theme) -> (Color, Color) {
    (
        parse_hex_color(&theme.wave_color).unwrap_or(Color::Gray),
        parse_hex_color(&theme.progress_color).unwrap_or(Color::White),
    )
}

pub fn draw<F>(f: &mut Frame, app: &App<F>)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    let size = f.area();
    let show_sources = app.sources.len() > 1;

    let mut constraints = vec![Constraint::Length(2)];
    if show_sources {
        constraints.push(Constraint::Length(app.sources.len().min(6) as u16 + 1));
    }
    constraints.extend([
        Constraint::Min(5),    // Waveform
        Constraint::Length(2), // Transport and toolbar
        Constraint::Length(2), // Panels
        Constraint::Length(3), // Help and status
    ]);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(size);

    let title = Paragraph::new("🎵 docwave")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let mut idx = 1;
    if show_sources {
        draw_sources(f, chunks[idx], app);
        idx += 1;
    }

    match &app.player {
        Some(player) => {
            draw_waveform(f, chunks[idx], app, player);
            draw_transport(f, chunks[idx + 1], player);
            draw_panels(f, chunks[idx + 2], player);
        }
        None => {
            let message = Paragraph::new("No audio loaded")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            f.render_widget(message, chunks[idx]);
        }
    }

    draw_help(f, chunks[idx + 3], app);
}

fn draw_sources<F>(f: &mut Frame, area: Rect, app: &App<F>)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    let visible = area.height.saturating_sub(1) as usize;
    let first = app.selected.saturating_sub(visible.saturating_sub(1));

    let lines: Vec<Line> = app
        .sources
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .map(|(i, source)| {
            let label = source.description.as_deref().unwrap_or(&source.url);
            if i == app.selected {
                Line::from(Span::styled(
                    format!("▸ {label}"),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::raw(format!("  {label}")))
            }
        })
        .collect();

    let list = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(list, area);
}

fn draw_waveform<F>(f: &mut Frame, area: Rect, app: &App<F>, player: &Player<F::Handle>)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let width = inner.width as usize;
    let height = inner.height as usize;
    if width == 0 || height == 0 {
        return;
    }

    let (wave_color, progress_color) = theme_colors(&app.theme);
    let played_columns = (app.progress() * width as f64) as usize;
    let columns: Vec<Vec<&str>> = waveform::resample(&app.peaks, width)
        .into_iter()
        .map(|amplitude| waveform::column(amplitude, height))
        .collect();

    let mut lines: Vec<Line> = (0..height)
        .map(|row| {
            Line::from(
                columns
                    .iter()
                    .enumerate()
                    .map(|(x, column)| {
                        let color = if x < played_columns {
                            progress_color
                        } else {
                            wave_color
                        };
                        Span::styled(column[row], Style::default().fg(color))
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    // The description label sits over the top-left corner of the waveform
    if let Some(description) = player.description()
        && let Some(first) = lines.first_mut()
    {
        let style = if player.is_highlighted(Control::Label) {
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightBlue)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Black)
                .bg(Color::White)
                .add_modifier(Modifier::BOLD)
        };
        *first = Line::from(Span::styled(format!(" {description} "), style));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn button<H: FrameDriven>(player: &Player<H>, control: Control, glyph: &str) -> Span<'static> {
    let style = if player.is_highlighted(control) {
        Style::default().bg(Color::LightBlue).fg(Color::Black)
    } else {
        Style::default()
    };
    Span::styled(format!(" {glyph} "), style)
}

fn draw_transport<H: FrameDriven>(f: &mut Frame, area: Rect, player: &Player<H>) {
    let state = player.session().state();
    let mut spans = vec![
        button(player, Control::PlayPause, state.play_button.icon.glyph()),
        Span::raw(" "),
        button(player, Control::ToolbarToggle, Control::ToolbarToggle.glyph()),
    ];

    if player.panels().is_shown(Panel::Toolbar) {
        spans.push(Span::styled(" │", Style::default().fg(Color::DarkGray)));
        for control in Control::TOOLBAR {
            spans.push(Span::raw(" "));
            spans.push(button(player, control, control.glyph()));
        }
    }

    let transport = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    f.render_widget(transport, area);
}

fn draw_panels<H: FrameDriven>(f: &mut Frame, area: Rect, player: &Player<H>) {
    let session = player.session();
    let panels = player.panels();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    // Speed and volume share the first row; at most one is open
    if panels.is_shown(Panel::Speed) {
        draw_slider(
            f,
            rows[0],
            Control::SpeedReset.glyph(),
            session.speed_slider() as f64 / 100.0,
            session.speed_readout().text(),
        );
    } else if panels.is_shown(Panel::Volume) {
        draw_slider(
            f,
            rows[0],
            Control::VolumeReset.glyph(),
            session.volume_slider(),
            session.volume_readout().text(),
        );
    }

    if panels.is_shown(Panel::TimeRatio) {
        let time = Paragraph::new(Line::from(vec![
            Span::styled(
                session.elapsed_readout().text().to_string(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw(" / "),
            Span::raw(session.total_readout().text().to_string()),
        ]))
        .alignment(Alignment::Center);
        f.render_widget(time, rows[1]);
    }
}

fn draw_slider(f: &mut Frame, area: Rect, glyph: &str, ratio: f64, readout: &str) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(8),
        ])
        .split(area);

    f.render_widget(Paragraph::new(format!(" {glyph}")), columns[0]);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
        .ratio(ratio.clamp(0.0, 1.0))
        .label("");
    f.render_widget(gauge, columns[1]);
    f.render_widget(
        Paragraph::new(format!(" {readout}")).style(Style::default().add_modifier(Modifier::BOLD)),
        columns[2],
    );
}

fn draw_help<F>(f: &mut Frame, area: Rect, app: &App<F>)
where
    F: HandleFactory,
    F::Handle: FrameDriven,
{
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    f.render_widget(Block::default().borders(Borders::TOP), rows[0]);

    let help = vec![
        Span::styled("[space]", Style::default().fg(Color::Green)),
        Span::raw(" play  "),
        Span::styled("[t]", Style::default().fg(Color::Cyan)),
        Span::raw(" toolbar  "),
        Span::styled("[l 0 f s v r]", Style::default().fg(Color::Magenta)),
        Span::raw(" tools  "),
        Span::styled("[←→]", Style::default().fg(Color::Magenta)),
        Span::raw(" adjust  "),
        Span::styled("[g]", Style::default().fg(Color::Yellow)),
        Span::raw(" go to  "),
        Span::styled("[q]", Style::default().fg(Color::Red)),
        Span::raw(" quit"),
    ];
    f.render_widget(
        Paragraph::new(Line::from(help)).alignment(Alignment::Center),
        rows[1],
    );

    let status = match (&app.seek_input, &app.status) {
        (Some(input), _) => Line::from(vec![
            Span::styled("Go to: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{input}▏")),
        ]),
        (None, Some(message)) => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )),
        (None, None) => Line::from(""),
    };
    f.render_widget(Paragraph::new(status).alignment(Alignment::Center), rows[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ababab"), Some(Color::Rgb(0xab, 0xab, 0xab)));
        assert_eq!(parse_hex_color("#f00"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("ababab"), None);
        assert_eq!(parse_hex_color("#abcd"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_theme_colors_fall_back() {
        let theme = Theme {
            wave_color: "blue".to_string(),
            progress_color: "#dadada".to_string(),
        };
        assert_eq!(
            theme_colors(&theme),
            (Color::Gray, Color::Rgb(0xda, 0xda, 0xda))
        );
    }
}
