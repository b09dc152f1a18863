//! Time entries screen rendering
//!
//! Shows one page of time entries as a table, followed by the result
//! summary and the page-number strip.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::data::TimeEntry;
use crate::datetime::format_date_time;
use crate::ui::widgets::PageStrip;

const COLUMN_WIDTHS: [Constraint; 6] = [
    Constraint::Length(5),  // ID
    Constraint::Length(5),  // Task
    Constraint::Min(10),    // Comment
    Constraint::Length(21), // Start
    Constraint::Length(21), // End
    Constraint::Length(8),  // Duration
];

fn entry_row(entry: &TimeEntry) -> Row<'static> {
    Row::new(vec![
        Cell::from(format!("#{}", entry.id)),
        Cell::from(entry.task_id.to_string()),
        Cell::from(entry.comment.clone()),
        Cell::from(format_date_time(&entry.start)),
        Cell::from(format_date_time(&entry.end)),
        Cell::from(entry.duration_label()),
    ])
}

/// Renders the list into `area`
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Table
            Constraint::Length(1), // Summary
            Constraint::Length(1), // Page strip
        ])
        .split(area);

    let title = if app.entries_loading {
        " Time Entries (loading...) ".to_string()
    } else {
        " Time Entries ".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(page) = app.entries.as_ref() else {
        let message = if app.entries_loading {
            "Loading time entries..."
        } else {
            "Time entries not loaded. Press r to reload."
        };
        let paragraph = Paragraph::new(Line::styled(message, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, chunks[0]);
        return;
    };

    if page.data.is_empty() {
        let paragraph = Paragraph::new(Line::styled(
            "No time entries found",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(paragraph, chunks[0]);
    } else {
        let rows: Vec<Row> = page
            .data
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let row = entry_row(entry);
                if i == app.entries_selected {
                    row.style(
                        Style::default()
                            .bg(Color::DarkGray)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    row
                }
            })
            .collect();

        let header = Row::new(vec!["ID", "Task", "Comment", "Start", "End", "Duration"]).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

        let table = Table::new(rows, COLUMN_WIDTHS).header(header).block(block);
        frame.render_widget(table, chunks[0]);
    }

    if let Some(pagination) = app.entries_pagination() {
        if !pagination.is_empty() {
            frame.render_widget(
                Paragraph::new(pagination.summary()).style(Style::default().fg(Color::Gray)),
                chunks[1],
            );
            if pagination.total_pages() > 1 {
                frame.render_widget(PageStrip::new(pagination), chunks[2]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::cache::QueryKey;
    use crate::data::{Page, PageRequest};
    use crate::ui::render_to_string;
    use crate::worker::{QueryData, Request, WorkerMessage};

    fn entry(id: u64) -> TimeEntry {
        TimeEntry {
            id,
            task_id: 42,
            user_id: String::new(),
            comment: format!("Review {}", id),
            start: "2024-01-15T09:00:00Z".to_string(),
            end: "2024-01-15T10:30:00Z".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn app_with_page(ids: Vec<u64>, total: u64) -> App {
        let mut app = App::default();
        app.show_time_entries();
        let (key, generation) = match app.take_requests().remove(0) {
            Request::Query { key, generation } => (key, generation),
            other => panic!("unexpected request: {:?}", other),
        };
        assert_eq!(key, QueryKey::TimeEntries(PageRequest::first(10)));
        app.handle_message(WorkerMessage::QueryFinished {
            key,
            generation,
            result: Ok(QueryData::TimeEntries(Page {
                data: ids.into_iter().map(entry).collect(),
                total,
                limit: 10,
                offset: 0,
            })),
        });
        app
    }

    #[test]
    fn test_loading_placeholder() {
        let mut app = App::default();
        app.show_time_entries();

        let content = render_to_string(&app);

        assert!(content.contains("Loading time entries..."));
    }

    #[test]
    fn test_rows_show_comment_and_duration() {
        let app = app_with_page(vec![1, 2, 3], 3);
        assert_eq!(app.state, AppState::TimeEntries);

        let content = render_to_string(&app);

        assert!(content.contains("Review 1"));
        assert!(content.contains("1h 30m"));
        assert!(content.contains("Showing 1 to 3 of 3 results"));
        assert!(!content.contains("Next ›"), "single page has no strip");
    }

    #[test]
    fn test_page_strip_for_multiple_pages() {
        let app = app_with_page((1..=10).collect(), 45);

        let content = render_to_string(&app);

        assert!(content.contains("Showing 1 to 10 of 45 results"));
        assert!(content.contains("[1]"));
        assert!(content.contains("Next"));
    }

    #[test]
    fn test_empty_list_message() {
        let app = app_with_page(Vec::new(), 0);
        assert!(render_to_string(&app).contains("No time entries found"));
    }
}
