//! Time entry form state and validation
//!
//! The form edits raw text for every field and only turns it into a
//! [`TimeEntryInput`] on submit, after validation.

use thiserror::Error;

use crate::data::{EntityId, TaskOption, TimeEntry, TimeEntryInput};
use crate::datetime::{is_valid_date_range, to_datetime_local, to_iso_string};

/// Reasons a submission is rejected, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a task")]
    MissingTask,
    #[error("Please enter a comment")]
    MissingComment,
    #[error("Please select a start time")]
    MissingStart,
    #[error("Please select an end time")]
    MissingEnd,
    #[error("End time must be after start time")]
    InvalidRange,
}

/// Whether the form creates a new entry or edits an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(EntityId),
}

/// Focusable parts of the form, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Task,
    Comment,
    Start,
    End,
    Submit,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Task,
        FormField::Comment,
        FormField::Start,
        FormField::End,
        FormField::Submit,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        let len = Self::ORDER.len();
        Self::ORDER[(self.position() + len - 1) % len]
    }

    pub fn label(self) -> &'static str {
        match self {
            FormField::Task => "Task ID",
            FormField::Comment => "Comment",
            FormField::Start => "Start",
            FormField::End => "End",
            FormField::Submit => "Submit",
        }
    }
}

/// Validates raw field values, reporting only the first failing rule
pub fn validate(
    task_id: &str,
    comment: &str,
    start: &str,
    end: &str,
) -> Result<TimeEntryInput, ValidationError> {
    let task_id = task_id.trim();
    if task_id.is_empty() {
        return Err(ValidationError::MissingTask);
    }
    let task_id: EntityId = task_id.parse().map_err(|_| ValidationError::MissingTask)?;

    let comment = comment.trim();
    if comment.is_empty() {
        return Err(ValidationError::MissingComment);
    }
    if start.trim().is_empty() {
        return Err(ValidationError::MissingStart);
    }
    if end.trim().is_empty() {
        return Err(ValidationError::MissingEnd);
    }
    if !is_valid_date_range(start, end) {
        return Err(ValidationError::InvalidRange);
    }

    Ok(TimeEntryInput {
        task_id,
        comment: comment.to_string(),
        start: to_iso_string(start).ok_or(ValidationError::InvalidRange)?,
        end: to_iso_string(end).ok_or(ValidationError::InvalidRange)?,
    })
}

/// Selection list over every task, used to fill the task field
#[derive(Debug, Clone, Default)]
pub struct TaskPicker {
    /// Available tasks, empty until loaded
    pub options: Vec<TaskOption>,
    /// Highlighted option
    pub selected: usize,
    /// Whether the options are still being fetched
    pub loading: bool,
}

impl TaskPicker {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn set_options(&mut self, options: Vec<TaskOption>) {
        self.options = options;
        self.selected = 0;
        self.loading = false;
    }

    pub fn move_up(&mut self) {
        if self.options.is_empty() {
            return;
        }
        if self.selected == 0 {
            self.selected = self.options.len() - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.options.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.options.len();
    }

    pub fn current(&self) -> Option<&TaskOption> {
        self.options.get(self.selected)
    }
}

/// State of the create/edit form
#[derive(Debug, Clone)]
pub struct TimeEntryForm {
    pub mode: FormMode,
    pub task_id: String,
    pub comment: String,
    /// Local `YYYY-MM-DDTHH:MM`
    pub start: String,
    /// Local `YYYY-MM-DDTHH:MM`
    pub end: String,
    pub focus: FormField,
    /// Validation or submission error shown above the fields
    pub error: Option<String>,
    /// A create/update request is running
    pub submitting: bool,
    /// Edit mode is waiting for the entry to load
    pub loading: bool,
    /// Open task picker, if any
    pub picker: Option<TaskPicker>,
}

impl TimeEntryForm {
    /// Empty form for a new entry
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            task_id: String::new(),
            comment: String::new(),
            start: String::new(),
            end: String::new(),
            focus: FormField::Task,
            error: None,
            submitting: false,
            loading: false,
            picker: None,
        }
    }

    /// Form for editing `id`, waiting for the entry to load
    pub fn edit(id: EntityId) -> Self {
        Self {
            mode: FormMode::Edit(id),
            loading: true,
            ..Self::create()
        }
    }

    /// Fills the fields from a loaded entry
    pub fn fill_from(&mut self, entry: &TimeEntry) {
        self.task_id = entry.task_id.to_string();
        self.comment = entry.comment.clone();
        self.start = to_datetime_local(&entry.start).unwrap_or_default();
        self.end = to_datetime_local(&entry.end).unwrap_or_default();
        self.loading = false;
    }

    /// Validates the fields, recording the first error on failure
    pub fn submit(&mut self) -> Option<TimeEntryInput> {
        self.error = None;
        match validate(&self.task_id, &self.comment, &self.start, &self.end) {
            Ok(input) => {
                self.submitting = true;
                Some(input)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                None
            }
        }
    }

    /// Records a failed submission
    pub fn submission_failed(&mut self, message: String) {
        self.submitting = false;
        self.error = Some(message);
    }

    /// Whether typing is accepted right now
    pub fn is_editable(&self) -> bool {
        !self.submitting && !self.loading && self.picker.is_none()
    }

    pub fn next_field(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn previous_field(&mut self) {
        self.focus = self.focus.previous();
    }

    /// Types a character into the focused field
    ///
    /// The task field takes digits only; date fields take the characters of
    /// `YYYY-MM-DDTHH:MM`.
    pub fn insert_char(&mut self, c: char) {
        if !self.is_editable() {
            return;
        }
        match self.focus {
            FormField::Task if c.is_ascii_digit() => self.task_id.push(c),
            FormField::Comment => self.comment.push(c),
            FormField::Start if is_datetime_char(c) => self.start.push(c),
            FormField::End if is_datetime_char(c) => self.end.push(c),
            _ => {}
        }
    }

    /// Deletes the last character of the focused field
    pub fn backspace(&mut self) {
        if !self.is_editable() {
            return;
        }
        if let Some(field) = self.focused_text_mut() {
            field.pop();
        }
    }

    /// Copies the highlighted picker task into the task field and closes the picker
    pub fn accept_picker(&mut self) {
        if let Some(picker) = self.picker.take() {
            if let Some(option) = picker.current() {
                self.task_id = option.task.id.to_string();
            }
        }
    }

    fn focused_text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Task => Some(&mut self.task_id),
            FormField::Comment => Some(&mut self.comment),
            FormField::Start => Some(&mut self.start),
            FormField::End => Some(&mut self.end),
            FormField::Submit => None,
        }
    }

    /// Duration preview for the current start/end, if both parse
    pub fn duration_preview(&self) -> Option<String> {
        if is_valid_date_range(&self.start, &self.end) {
            Some(crate::datetime::format_duration(&self.start, &self.end))
        } else {
            None
        }
    }
}

fn is_datetime_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | ':' | 'T')
}
