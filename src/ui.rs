use crate::model::{PlaybackSnapshot, Track};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph};
use std::time::Duration;

const APP_TITLE: &str = "aria v0.1.0  ";

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    panel_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    selected_bg: Color,
}

fn palette() -> Palette {
    Palette {
        bg: Color::Rgb(10, 15, 24),
        panel_bg: Color::Rgb(19, 29, 43),
        border: Color::Rgb(69, 121, 176),
        text: Color::Rgb(214, 228, 248),
        muted: Color::Rgb(149, 173, 204),
        accent: Color::Rgb(100, 203, 184),
        selected_bg: Color::Rgb(34, 55, 82),
    }
}

fn panel_block(title: &str, colors: Palette) -> Block<'_> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .style(Style::default().bg(colors.panel_bg).fg(colors.text))
        .border_style(Style::default().fg(colors.border))
}

fn layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
            Constraint::Length(3),
        ])
        .split(area)
}

pub fn draw(
    frame: &mut Frame,
    snapshot: &PlaybackSnapshot,
    tracks: &[Track],
    selected: usize,
    status: &str,
    output: Option<&str>,
    volume: f32,
) {
    let colors = palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg)),
        frame.area(),
    );

    let vertical = layout(frame.area());
    draw_header(frame, vertical[0], status, colors);
    draw_playlist(frame, vertical[1], snapshot, tracks, selected, colors);
    draw_transport(frame, vertical[2], snapshot, colors);
    draw_footer(frame, vertical[3], output, volume, colors);
}

fn draw_header(frame: &mut Frame, area: Rect, status: &str, colors: Palette) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status.to_string(), Style::default().fg(colors.muted)),
    ]))
    .block(panel_block("Status", colors));
    frame.render_widget(header, area);
}

fn draw_playlist(
    frame: &mut Frame,
    area: Rect,
    snapshot: &PlaybackSnapshot,
    tracks: &[Track],
    selected: usize,
    colors: Palette,
) {
    let current_id = snapshot.current.as_ref().map(|track| track.id);
    let items: Vec<ListItem> = tracks
        .iter()
        .map(|track| {
            let is_current = current_id == Some(track.id);
            let marker = if is_current { "> " } else { "  " };
            let label = if track.artist.is_empty() {
                format!("{marker}{:>3}  {}", track.id, track.title)
            } else {
                format!("{marker}{:>3}  {} - {}", track.id, track.title, track.artist)
            };
            let style = if is_current {
                Style::default()
                    .fg(colors.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.text)
            };
            ListItem::new(label).style(style)
        })
        .collect();

    let mut state = ListState::default();
    if !tracks.is_empty() {
        state.select(Some(selected.min(tracks.len() - 1)));
    }

    let list = List::new(items)
        .block(panel_block("Playlist", colors))
        .highlight_style(Style::default().bg(colors.selected_bg));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_transport(frame: &mut Frame, area: Rect, snapshot: &PlaybackSnapshot, colors: Palette) {
    let block = panel_block("Now Playing", colors);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(inner);

    let state_marker = if snapshot.playing { "|>" } else { "||" };
    let mut line = vec![
        Span::styled(
            format!("{state_marker} "),
            Style::default().fg(colors.accent),
        ),
        Span::styled(
            snapshot
                .current
                .as_ref()
                .map(|track| {
                    if track.artist.is_empty() {
                        track.title.clone()
                    } else {
                        format!("{} - {}", track.title, track.artist)
                    }
                })
                .unwrap_or_else(|| String::from("Nothing staged")),
            Style::default().fg(colors.text),
        ),
    ];
    if snapshot.shuffled {
        line.push(Span::styled(
            "  [shuffle]",
            Style::default().fg(colors.accent),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(line)), rows[0]);

    let elapsed = fmt_time(snapshot.elapsed);
    let total = snapshot.duration.map(fmt_time).unwrap_or_else(unknown_time);
    let gauge = Gauge::default()
        .ratio(snapshot.progress.clamp(0.0, 1.0))
        .label(format!("{elapsed} / {total}"))
        .gauge_style(Style::default().fg(colors.accent).bg(colors.selected_bg));
    frame.render_widget(gauge, rows[1]);
}

fn draw_footer(
    frame: &mut Frame,
    area: Rect,
    output: Option<&str>,
    volume: f32,
    colors: Palette,
) {
    let hints = format!(
        "space pause/play | n next | b previous | s shuffle | r linear | arrows seek/select | enter play | +/- volume ({}%) | {} | q quit",
        (volume * 100.0).round() as u16,
        output.unwrap_or("no output"),
    );
    let footer = Paragraph::new(Span::styled(hints, Style::default().fg(colors.muted)))
        .block(panel_block("Keys", colors));
    frame.render_widget(footer, area);
}

pub fn fmt_time(value: Duration) -> String {
    let total = value.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

fn unknown_time() -> String {
    String::from("0:00")
}
