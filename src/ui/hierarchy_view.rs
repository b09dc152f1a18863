//! Hierarchy screen rendering
//!
//! Draws the client → project → task tree as an indented list. Expandable
//! nodes carry a marker for their state, lists with more children on the
//! server end in a "load more" row.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::hierarchy::{ExpandState, NodeKind, RowKind, TreeRow};

/// Marker in front of a node
fn state_marker(state: Option<ExpandState>) -> &'static str {
    match state {
        Some(ExpandState::Collapsed) => "▸ ",
        Some(ExpandState::Expanded) | Some(ExpandState::LoadingMore) => "▾ ",
        Some(ExpandState::Loading) => "⟳ ",
        None => "• ",
    }
}

fn kind_color(kind: NodeKind) -> Color {
    match kind {
        NodeKind::Client => Color::Cyan,
        NodeKind::Project => Color::Green,
        NodeKind::Task => Color::White,
    }
}

/// Text of a single tree row, without indentation
fn row_text(row: &TreeRow) -> (String, Style) {
    match &row.kind {
        RowKind::Node {
            kind, name, state, ..
        } => {
            let suffix = if *state == Some(ExpandState::Loading) {
                "  loading..."
            } else {
                ""
            };
            (
                format!("{}{}{}", state_marker(*state), name, suffix),
                Style::default().fg(kind_color(*kind)),
            )
        }
        RowKind::LoadMore {
            loaded, loading, ..
        } => {
            let text = if *loading {
                "  Loading more...".to_string()
            } else {
                format!("  Load more ({} shown)", loaded)
            };
            (text, Style::default().fg(Color::Yellow))
        }
        RowKind::Empty { kind } => (
            format!("  No {}s", kind.label().to_lowercase()),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    }
}

/// Renders the tree into `area`
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Clients ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let rows = app.tree_rows();
    let lines: Vec<Line> = if rows.is_empty() {
        let message = if app.hierarchy.is_root_loading() {
            "Loading clients..."
        } else if app.hierarchy.clients().is_some() {
            "No clients found"
        } else {
            "Press r to load clients"
        };
        vec![Line::from(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let visible = area.height.saturating_sub(2) as usize;
        let cursor = app.tree_cursor.min(rows.len() - 1);
        let scroll = (cursor + 1).saturating_sub(visible.max(1));

        rows.iter()
            .enumerate()
            .skip(scroll)
            .take(visible)
            .map(|(i, row)| {
                let (text, style) = row_text(row);
                let style = if i == cursor {
                    style.bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    style
                };
                Line::from(vec![
                    Span::raw("  ".repeat(row.depth as usize)),
                    Span::styled(text, style),
                ])
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
