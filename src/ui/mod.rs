//! UI rendering module for memview
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components. Rendering only reads [`App`]
//! state; every rule it displays lives in a testable module.

pub mod entry_form;
pub mod help_overlay;
pub mod hierarchy_view;
pub mod time_entries;
pub mod widgets;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, AppState};
use crate::banner::{Banner, BannerKind};

/// Renders the whole screen for the current state
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let banner_height = if app.banner.is_some() { 1 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),             // Tabs + separator
            Constraint::Length(banner_height), // Banner
            Constraint::Min(3),                // Screen
            Constraint::Length(1),             // Key hints
        ])
        .split(area);

    render_header(frame, app, chunks[0]);
    if let Some(banner) = &app.banner {
        render_banner(frame, banner, chunks[1]);
    }

    match app.state {
        AppState::Hierarchy => hierarchy_view::render(frame, app, chunks[2]),
        AppState::TimeEntries => time_entries::render(frame, app, chunks[2]),
        AppState::EntryForm => entry_form::render(frame, app, chunks[2]),
    }

    render_key_hints(frame, app.state, chunks[3]);

    if app.show_help {
        help_overlay::render(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let tab = |key: &str, label: &str, active: bool| {
        let style = if active {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        Span::styled(format!(" {} {} ", key, label), style)
    };

    let width = area.width as usize;
    let lines = vec![
        Line::from(vec![
            Span::styled(
                "MEMVIEW",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            tab("1", "Hierarchy", app.state == AppState::Hierarchy),
            Span::raw(" "),
            tab("2", "Time entries", app.state == AppState::TimeEntries),
            Span::raw(" "),
            tab("n", "New entry", app.state == AppState::EntryForm),
        ]),
        Line::from(Span::styled(
            "─".repeat(width),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_banner(frame: &mut Frame, banner: &Banner, area: Rect) {
    let (style, suffix) = match banner.kind {
        BannerKind::Success => (Style::default().fg(Color::Black).bg(Color::Green), ""),
        BannerKind::Error => (
            Style::default().fg(Color::White).bg(Color::Red),
            "  (x to dismiss)",
        ),
    };
    let text = format!(" {}{}", banner.message, suffix);
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_key_hints(frame: &mut Frame, state: AppState, area: Rect) {
    let hints: &[(&str, &str)] = match state {
        AppState::Hierarchy => &[
            ("↑/↓", "Move"),
            ("Enter", "Expand"),
            ("←", "Collapse"),
            ("r", "Refresh"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        AppState::TimeEntries => &[
            ("↑/↓", "Move"),
            ("←/→", "Page"),
            ("Enter", "Edit"),
            ("n", "New"),
            ("r", "Reload"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
        AppState::EntryForm => &[
            ("Tab", "Next field"),
            ("Ctrl-t", "Pick task"),
            ("Ctrl-s", "Save"),
            ("Esc", "Cancel"),
        ],
    };

    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, Style::default().fg(Color::Yellow)),
                Span::raw(format!(" {}  ", label)),
            ]
        })
        .collect();

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

/// Renders `app` into an 80x24 test buffer and returns its text
#[cfg(test)]
pub(crate) fn render_to_string(app: &App) -> String {
    use ratatui::{backend::TestBackend, Terminal};

    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|frame| render(frame, app)).unwrap();

    let buffer = terminal.backend().buffer();
    buffer.content().iter().map(|cell| cell.symbol()).collect()
}
