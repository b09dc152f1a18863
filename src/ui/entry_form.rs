//! Create/edit form rendering
//!
//! Draws the four input fields, the submit button, a duration preview and
//! the validation or submission error. The task picker opens as a centered
//! overlay on top of the form.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::form::{FormField, FormMode, TaskPicker, TimeEntryForm};
use crate::ui::help_overlay::centered_rect;

fn title(form: &TimeEntryForm) -> String {
    match form.mode {
        FormMode::Create => " New Time Entry ".to_string(),
        FormMode::Edit(id) => format!(" Edit Time Entry #{} ", id),
    }
}

fn field_line<'a>(form: &TimeEntryForm, field: FormField, value: &'a str, hint: &'a str) -> Line<'a> {
    let focused = form.focus == field;
    let label_style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };

    let mut spans = vec![
        Span::styled(format!("{:<10}", field.label()), label_style),
        Span::raw(value),
    ];
    if focused {
        spans.push(Span::styled("█", Style::default().fg(Color::Yellow)));
    }
    if value.is_empty() {
        spans.push(Span::styled(
            format!(" {}", hint),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn submit_line(form: &TimeEntryForm) -> Line<'static> {
    let label = match (form.submitting, form.mode) {
        (true, FormMode::Create) => "[ Creating... ]",
        (true, FormMode::Edit(_)) => "[ Updating... ]",
        (false, FormMode::Create) => "[ Create Time Entry ]",
        (false, FormMode::Edit(_)) => "[ Update Time Entry ]",
    };
    let style = if form.focus == FormField::Submit {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    };
    Line::from(Span::styled(label, style))
}

/// Renders the open form into `area`
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let block = Block::default()
        .title(title(form))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if form.loading {
        let paragraph = Paragraph::new(Line::styled(
            "Loading time entry...",
            Style::default().fg(Color::DarkGray),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let mut lines = Vec::new();
    if let Some(error) = &form.error {
        lines.push(Line::styled(
            error.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(""));
    }

    lines.push(field_line(form, FormField::Task, &form.task_id, "(Ctrl-t to choose)"));
    lines.push(field_line(form, FormField::Comment, &form.comment, ""));
    lines.push(field_line(form, FormField::Start, &form.start, "YYYY-MM-DDTHH:MM"));
    lines.push(field_line(form, FormField::End, &form.end, "YYYY-MM-DDTHH:MM"));
    lines.push(Line::from(""));

    if let Some(duration) = form.duration_preview() {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Duration"), Style::default().fg(Color::Gray)),
            Span::styled(duration, Style::default().fg(Color::Green)),
        ]));
        lines.push(Line::from(""));
    }

    lines.push(submit_line(form));

    frame.render_widget(Paragraph::new(lines).block(block), area);

    if let Some(picker) = &form.picker {
        render_picker(frame, picker, area);
    }
}

fn render_picker(frame: &mut Frame, picker: &TaskPicker, area: Rect) {
    let overlay = centered_rect(60, area.height.saturating_sub(2).min(16), area);
    frame.render_widget(Clear, overlay);

    let block = Block::default()
        .title(" Choose Task ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let lines: Vec<Line> = if picker.loading {
        vec![Line::styled("Loading tasks...", Style::default().fg(Color::DarkGray))]
    } else if picker.options.is_empty() {
        vec![Line::styled("No tasks available", Style::default().fg(Color::DarkGray))]
    } else {
        let visible = overlay.height.saturating_sub(2).max(1) as usize;
        let scroll = (picker.selected + 1).saturating_sub(visible);
        picker
            .options
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible)
            .map(|(i, option)| {
                let style = if i == picker.selected {
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::styled(format!("#{:<5} {}", option.task.id, option.label()), style)
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), overlay);
}
