//! Application state management for memview
//!
//! This module contains the main application state, handling keyboard input,
//! routing fetch results into the tree, list and form, and state transitions
//! between the different screens.
//!
//! The app never performs I/O. Requests it needs are queued in an outbox
//! that the event loop drains into the [`Worker`](crate::worker::Worker),
//! and results come back through [`App::handle_message`].

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::banner::Banner;
use crate::cache::{Lookup, QueryCache, QueryKey, QueryScope};
use crate::cli::{StartScreen, StartupConfig};
use crate::data::{EntityId, Page, PageRequest, TimeEntry};
use crate::form::{FormField, FormMode, TaskPicker, TimeEntryForm};
use crate::hierarchy::{
    ExpandState, Hierarchy, NodeKind, NodeRef, RowKind, TreeRow, DEFAULT_PAGE_SIZE,
};
use crate::pagination::Pagination;
use crate::worker::{Mutation, QueryData, Request, WorkerMessage};

/// Application state enum representing the current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Client → project → task tree
    Hierarchy,
    /// Paginated list of time entries
    TimeEntries,
    /// Create or edit form
    EntryForm,
}

/// Main application struct managing state and data
pub struct App {
    /// Current screen
    pub state: AppState,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Flag to show help overlay
    pub show_help: bool,
    /// Success or error banner above the current screen
    pub banner: Option<Banner>,
    /// Lazily loaded tree
    pub hierarchy: Hierarchy,
    /// Index of the highlighted row in the tree
    pub tree_cursor: usize,
    /// Currently displayed page of time entries
    pub entries: Option<Page<TimeEntry>>,
    /// Current time entries page, 1-based
    pub entries_page: u64,
    /// Index of the highlighted entry on the page
    pub entries_selected: usize,
    /// A time entries page is being fetched
    pub entries_loading: bool,
    /// Open create/edit form
    pub form: Option<TimeEntryForm>,
    /// Entries per page in the list and children per fetch in the tree
    page_size: u64,
    cache: QueryCache<QueryData>,
    outbox: Vec<Request>,
    /// Submission the open form is waiting for
    pending_submission: Option<u64>,
    next_submission: u64,
}

impl App {
    /// Creates a new App instance on the hierarchy screen, nothing loaded yet
    pub fn new(page_size: u64) -> Self {
        let page_size = page_size.max(1);
        Self {
            state: AppState::Hierarchy,
            should_quit: false,
            show_help: false,
            banner: None,
            hierarchy: Hierarchy::new(page_size),
            tree_cursor: 0,
            entries: None,
            entries_page: 1,
            entries_selected: 0,
            entries_loading: false,
            form: None,
            page_size,
            cache: QueryCache::new(),
            outbox: Vec::new(),
            pending_submission: None,
            next_submission: 1,
        }
    }

    /// Creates a new App instance with the given startup configuration.
    ///
    /// Opens the requested start screen and queues its first requests.
    pub fn with_startup_config(config: &StartupConfig) -> Self {
        let mut app = Self::new(config.page_size);
        match config.start_screen {
            StartScreen::Hierarchy => app.show_hierarchy(),
            StartScreen::TimeEntries => app.show_time_entries(),
            StartScreen::NewEntry => app.open_create_form(None),
            StartScreen::EditEntry(id) => app.open_edit_form(id),
        }
        app
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Takes every request queued since the last call
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    /// Asks for the data behind `key`
    ///
    /// Fresh cached data is applied at once, a request already running is
    /// left alone, and anything else is queued for the worker.
    pub fn request(&mut self, key: QueryKey) {
        match self.cache.begin(&key) {
            Lookup::Fresh(data) => self.apply_query(&key, data),
            Lookup::InFlight => {}
            Lookup::Fetch(generation) => self.outbox.push(Request::Query { key, generation }),
        }
    }

    /// Routes a finished request into the app state
    ///
    /// Query results superseded by an invalidation are dropped, and a
    /// mutation result only touches the form that submitted it.
    pub fn handle_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::QueryFinished {
                key,
                generation,
                result,
            } => match result {
                Ok(data) => {
                    if self.cache.store(key.clone(), generation, data.clone()) {
                        self.apply_query(&key, data);
                    }
                }
                Err(message) => {
                    if self.cache.fail(&key, generation) {
                        self.query_failed(&key, message);
                    }
                }
            },
            WorkerMessage::MutationFinished {
                submission,
                mutation,
                result,
            } => {
                let from_open_form = self.pending_submission == Some(submission);
                if from_open_form {
                    self.pending_submission = None;
                }
                match result {
                    Ok(entry) => self.mutation_succeeded(&mutation, &entry, from_open_form),
                    Err(message) if from_open_form => {
                        if let Some(form) = self.form.as_mut() {
                            form.submission_failed(message);
                        }
                    }
                    Err(message) => {
                        debug!(submission, "result for a closed form");
                        self.banner = Some(Banner::error(
                            format!("Failed to save time entry: {}", message),
                            Instant::now(),
                        ));
                    }
                }
            }
        }
    }

    /// Expires the success banner and evicts old cache entries
    pub fn tick(&mut self, now: Instant) {
        if self.banner.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.banner = None;
        }
        self.cache.collect_garbage();
    }

    /// Handles keyboard input based on current state
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if key_event.code == KeyCode::Char('c') && key_event.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // Handle help overlay - intercepts all keys when shown
        if self.show_help {
            match key_event.code {
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                    self.show_help = false;
                }
                _ => {}
            }
            return;
        }

        // The form takes every printable key as input
        if self.state == AppState::EntryForm {
            self.handle_form_key(key_event);
            return;
        }

        match key_event.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('1') => self.show_hierarchy(),
            KeyCode::Char('2') => self.show_time_entries(),
            KeyCode::Char('n') => self.open_create_form(None),
            KeyCode::Char('x') => {
                self.banner = None;
            }
            _ => match self.state {
                AppState::Hierarchy => self.handle_hierarchy_key(key_event),
                AppState::TimeEntries => self.handle_entries_key(key_event),
                AppState::EntryForm => {}
            },
        }
    }

    fn handle_hierarchy_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_tree_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_tree_down(),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate_tree_row(true),
            KeyCode::Right | KeyCode::Char('l') => self.activate_tree_row(false),
            KeyCode::Left | KeyCode::Char('h') => self.collapse_tree_row(),
            KeyCode::Char('r') => self.refresh_hierarchy(),
            _ => {}
        }
    }

    fn handle_entries_key(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_entry_up(),
            KeyCode::Down | KeyCode::Char('j') => self.move_entry_down(),
            KeyCode::Left | KeyCode::Char('h') => self.previous_entries_page(),
            KeyCode::Right | KeyCode::Char('l') => self.next_entries_page(),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = self.selected_entry().map(|entry| entry.id) {
                    self.open_edit_form(id);
                }
            }
            KeyCode::Char('r') => self.reload_time_entries(),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key_event: KeyEvent) {
        let Some((focus, picker_open)) = self.form.as_ref().map(|f| (f.focus, f.picker.is_some()))
        else {
            self.show_time_entries();
            return;
        };
        if picker_open {
            self.handle_picker_key(key_event);
            return;
        }

        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        match key_event.code {
            KeyCode::Esc => self.cancel_form(),
            KeyCode::Char('s') if ctrl => self.submit_form(),
            KeyCode::Char('t') if ctrl => self.open_task_picker(),
            KeyCode::Enter if focus == FormField::Submit => self.submit_form(),
            code => {
                let Some(form) = self.form.as_mut() else {
                    return;
                };
                match code {
                    KeyCode::Tab | KeyCode::Enter => form.next_field(),
                    KeyCode::BackTab => form.previous_field(),
                    KeyCode::Backspace => form.backspace(),
                    KeyCode::Char(c) if !ctrl => form.insert_char(c),
                    _ => {}
                }
            }
        }
    }

    fn handle_picker_key(&mut self, key_event: KeyEvent) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        match key_event.code {
            KeyCode::Esc => form.picker = None,
            KeyCode::Enter => form.accept_picker(),
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(picker) = form.picker.as_mut() {
                    picker.move_up();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(picker) = form.picker.as_mut() {
                    picker.move_down();
                }
            }
            _ => {}
        }
    }

    /// Switches to the tree, loading the root clients on first use
    pub fn show_hierarchy(&mut self) {
        self.state = AppState::Hierarchy;
        if let Some(key) = self.hierarchy.load_root() {
            self.request(key);
        }
    }

    /// Switches to the time entries list, loading it on first use
    pub fn show_time_entries(&mut self) {
        self.state = AppState::TimeEntries;
        if self.entries.is_none() && !self.entries_loading {
            self.load_entries();
        }
    }

    /// Opens an empty form, optionally preset to a task
    pub fn open_create_form(&mut self, task_id: Option<EntityId>) {
        let mut form = TimeEntryForm::create();
        if let Some(id) = task_id {
            form.task_id = id.to_string();
            form.focus = FormField::Comment;
        }
        self.form = Some(form);
        self.pending_submission = None;
        self.state = AppState::EntryForm;
    }

    /// Opens the form for `id` and loads the entry into it
    pub fn open_edit_form(&mut self, id: EntityId) {
        self.form = Some(TimeEntryForm::edit(id));
        self.pending_submission = None;
        self.state = AppState::EntryForm;
        self.request(QueryKey::TimeEntry(id));
    }

    fn cancel_form(&mut self) {
        self.form = None;
        self.pending_submission = None;
        self.show_time_entries();
    }

    fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting || form.loading {
            return;
        }
        let Some(input) = form.submit() else {
            return;
        };
        let mutation = match form.mode {
            FormMode::Create => Mutation::Create(input),
            FormMode::Edit(id) => Mutation::Update { id, input },
        };
        let submission = self.next_submission;
        self.next_submission += 1;
        self.pending_submission = Some(submission);
        debug!(submission, verb = mutation.verb(), "submitting time entry");
        self.outbox.push(Request::Mutation {
            submission,
            mutation,
        });
    }

    fn open_task_picker(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if !form.is_editable() {
            return;
        }
        form.picker = Some(TaskPicker::loading());
        self.request(QueryKey::AllTasks);
    }

    /// Key of the time entries page currently shown
    pub fn entries_request(&self) -> PageRequest {
        let offset = Pagination::new(self.entries_page, 0, self.page_size).offset();
        PageRequest::new(self.page_size, offset)
    }

    fn load_entries(&mut self) {
        self.entries_loading = true;
        self.request(QueryKey::TimeEntries(self.entries_request()));
    }

    /// Pagination of the loaded list, if any
    pub fn entries_pagination(&self) -> Option<Pagination> {
        self.entries
            .as_ref()
            .map(|page| Pagination::new(self.entries_page, page.total, self.page_size))
    }

    pub fn selected_entry(&self) -> Option<&TimeEntry> {
        self.entries.as_ref()?.data.get(self.entries_selected)
    }

    fn previous_entries_page(&mut self) {
        if self.entries_pagination().is_some_and(|p| p.has_previous()) {
            self.entries_page -= 1;
            self.entries_selected = 0;
            self.load_entries();
        }
    }

    fn next_entries_page(&mut self) {
        if self.entries_pagination().is_some_and(|p| p.has_next()) {
            self.entries_page += 1;
            self.entries_selected = 0;
            self.load_entries();
        }
    }

    fn entry_count(&self) -> usize {
        self.entries.as_ref().map_or(0, |page| page.data.len())
    }

    fn move_entry_up(&mut self) {
        let count = self.entry_count();
        if count > 0 {
            if self.entries_selected == 0 {
                self.entries_selected = count - 1;
            } else {
                self.entries_selected -= 1;
            }
        }
    }

    fn move_entry_down(&mut self) {
        let count = self.entry_count();
        if count > 0 {
            self.entries_selected = (self.entries_selected + 1) % count;
        }
    }

    /// Rows of the tree as currently visible
    pub fn tree_rows(&self) -> Vec<TreeRow> {
        self.hierarchy.visible_rows()
    }

    fn move_tree_up(&mut self) {
        let count = self.tree_rows().len();
        if count > 0 {
            if self.tree_cursor == 0 {
                self.tree_cursor = count - 1;
            } else {
                self.tree_cursor -= 1;
            }
        }
    }

    fn move_tree_down(&mut self) {
        let count = self.tree_rows().len();
        if count > 0 {
            self.tree_cursor = (self.tree_cursor + 1) % count;
        }
    }

    fn clamp_tree_cursor(&mut self) {
        let count = self.tree_rows().len();
        self.tree_cursor = self.tree_cursor.min(count.saturating_sub(1));
    }

    /// Acts on the highlighted row
    ///
    /// With `toggle` an expanded node closes again and a task opens a new
    /// entry for it; without, nodes only ever open.
    fn activate_tree_row(&mut self, toggle: bool) {
        let Some(row) = self.tree_rows().into_iter().nth(self.tree_cursor) else {
            return;
        };
        let key = match row.kind {
            RowKind::Node {
                kind: NodeKind::Task,
                id,
                ..
            } => {
                if toggle {
                    self.open_create_form(Some(id));
                }
                None
            }
            RowKind::Node { kind, id, .. } => node_ref(kind, id).and_then(|node| {
                if toggle {
                    self.hierarchy.toggle(node)
                } else {
                    self.hierarchy.expand(node)
                }
            }),
            RowKind::LoadMore { list, .. } => self.hierarchy.load_more(list),
            RowKind::Empty { .. } => None,
        };
        if let Some(key) = key {
            self.request(key);
        }
        self.clamp_tree_cursor();
    }

    /// Collapses the highlighted node, or moves to its parent
    fn collapse_tree_row(&mut self) {
        let rows = self.tree_rows();
        let Some(row) = rows.get(self.tree_cursor) else {
            return;
        };
        if let RowKind::Node {
            kind,
            id,
            state: Some(ExpandState::Expanded | ExpandState::LoadingMore),
            ..
        } = row.kind
        {
            if let Some(node) = node_ref(kind, id) {
                self.hierarchy.collapse(node);
                self.clamp_tree_cursor();
                return;
            }
        }
        if let Some(parent) = rows[..self.tree_cursor]
            .iter()
            .rposition(|candidate| candidate.depth < row.depth)
        {
            self.tree_cursor = parent;
        }
    }

    /// Drops the tree and every cached response, then reloads the root
    pub fn refresh_hierarchy(&mut self) {
        info!("refreshing hierarchy");
        self.hierarchy.reset();
        self.cache.clear();
        if self.entries_loading {
            // Its result was superseded; the list loads again when shown
            self.entries = None;
            self.entries_loading = false;
        }
        self.tree_cursor = 0;
        self.show_hierarchy();
    }

    fn apply_query(&mut self, key: &QueryKey, data: QueryData) {
        let applied = match (key, data) {
            (QueryKey::Clients(_), QueryData::Clients(page)) => self.hierarchy.apply_clients(page),
            (QueryKey::Projects { client_id, .. }, QueryData::Projects(page)) => {
                self.hierarchy.apply_projects(*client_id, page)
            }
            (QueryKey::Tasks { project_id, .. }, QueryData::Tasks(page)) => {
                self.hierarchy.apply_tasks(*project_id, page)
            }
            (QueryKey::TimeEntries(request), QueryData::TimeEntries(page)) => {
                if *request == self.entries_request() {
                    self.entries = Some(page);
                    self.entries_loading = false;
                    self.entries_selected = self.entries_selected.min(self.entry_count().saturating_sub(1));
                    true
                } else {
                    false
                }
            }
            (QueryKey::TimeEntry(id), QueryData::TimeEntry(entry)) => match self.form.as_mut() {
                Some(form) if form.mode == FormMode::Edit(*id) && form.loading => {
                    form.fill_from(&entry);
                    true
                }
                _ => false,
            },
            (QueryKey::AllTasks, QueryData::AllTasks(options)) => {
                match self.form.as_mut().and_then(|form| form.picker.as_mut()) {
                    Some(picker) => {
                        picker.set_options(options);
                        true
                    }
                    None => false,
                }
            }
            _ => false,
        };
        if !applied {
            debug!(?key, "result no longer needed");
        }
        self.clamp_tree_cursor();
    }

    fn query_failed(&mut self, key: &QueryKey, message: String) {
        let subject = match key {
            QueryKey::Clients(_) => "clients",
            QueryKey::Projects { .. } => "projects",
            QueryKey::Tasks { .. } => "tasks",
            QueryKey::TimeEntries(_) => "time entries",
            QueryKey::TimeEntry(_) => "time entry",
            QueryKey::AllTasks => "task list",
        };
        let text = format!("Failed to load {}: {}", subject, message);

        match key {
            QueryKey::Clients(_) | QueryKey::Projects { .. } | QueryKey::Tasks { .. } => {
                self.hierarchy.fail(key);
            }
            QueryKey::TimeEntries(_) => self.entries_loading = false,
            QueryKey::TimeEntry(id) => {
                if let Some(form) = self.form.as_mut() {
                    if form.mode == FormMode::Edit(*id) {
                        form.loading = false;
                        form.error = Some(text);
                        return;
                    }
                }
            }
            QueryKey::AllTasks => {
                if let Some(form) = self.form.as_mut() {
                    form.picker = None;
                    form.error = Some(text);
                    return;
                }
            }
        }
        self.banner = Some(Banner::error(text, Instant::now()));
    }

    /// Drops cached time entries and fetches again whatever shows them
    fn reload_time_entries(&mut self) {
        self.cache.invalidate(QueryScope::TimeEntries);
        if self.state == AppState::TimeEntries {
            self.load_entries();
        } else {
            self.entries = None;
            self.entries_loading = false;
        }
        let loading_edit = self.form.as_ref().and_then(|form| match form.mode {
            FormMode::Edit(id) if form.loading => Some(id),
            _ => None,
        });
        if let Some(id) = loading_edit {
            self.request(QueryKey::TimeEntry(id));
        }
    }

    /// Shows the saved entry; only the submitting form is closed
    fn mutation_succeeded(&mut self, mutation: &Mutation, entry: &TimeEntry, from_open_form: bool) {
        info!(id = entry.id, verb = mutation.verb(), "time entry saved");
        self.banner = Some(Banner::success(
            format!("Time entry #{} {} successfully!", entry.id, mutation.verb()),
            Instant::now(),
        ));
        if from_open_form {
            self.form = None;
            if matches!(mutation, Mutation::Create(_)) {
                self.entries_page = 1;
                self.entries_selected = 0;
            }
            self.state = AppState::TimeEntries;
        }
        self.reload_time_entries();
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

fn node_ref(kind: NodeKind, id: EntityId) -> Option<NodeRef> {
    match kind {
        NodeKind::Client => Some(NodeRef::Client(id)),
        NodeKind::Project => Some(NodeRef::Project(id)),
        NodeKind::Task => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::BannerKind;
    use crate::data::{Client, Project, Task, TaskOption};
    use std::time::Duration;

    /// Helper to create a KeyEvent from a KeyCode
    fn key_event(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn client(id: EntityId) -> Client {
        Client {
            id,
            name: format!("Client {}", id),
            description: String::new(),
            status: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn project(id: EntityId, client_id: EntityId) -> Project {
        Project {
            id,
            client_id,
            name: format!("Project {}", id),
            status: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn task(id: EntityId) -> Task {
        Task {
            id,
            parent: 0,
            name: format!("Task {}", id),
            status: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entry(id: EntityId) -> TimeEntry {
        TimeEntry {
            id,
            task_id: 3,
            user_id: String::new(),
            comment: format!("Entry {}", id),
            start: "2024-01-15T09:00:00.000Z".to_string(),
            end: "2024-01-15T10:30:00.000Z".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn entries_page(ids: std::ops::RangeInclusive<EntityId>, total: u64, offset: u64) -> Page<TimeEntry> {
        Page {
            data: ids.map(entry).collect(),
            total,
            limit: 10,
            offset,
        }
    }

    /// Answers the fetch currently running for `key`
    fn deliver(app: &mut App, key: QueryKey, data: QueryData) {
        let generation = app.cache.running_generation(&key).unwrap_or(0);
        deliver_generation(app, key, generation, data);
    }

    fn deliver_generation(app: &mut App, key: QueryKey, generation: u64, data: QueryData) {
        app.handle_message(WorkerMessage::QueryFinished {
            key,
            generation,
            result: Ok(data),
        });
    }

    fn query_keys(requests: Vec<Request>) -> Vec<QueryKey> {
        requests
            .into_iter()
            .filter_map(|r| match r {
                Request::Query { key, .. } => Some(key),
                Request::Mutation { .. } => None,
            })
            .collect()
    }

    /// Takes the single queued mutation with its submission id
    fn take_mutation(app: &mut App) -> (u64, Mutation) {
        match app.take_requests().remove(0) {
            Request::Mutation {
                submission,
                mutation,
            } => (submission, mutation),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    fn config(start_screen: StartScreen) -> StartupConfig {
        StartupConfig {
            api_key: "key".to_string(),
            base_url: "http://localhost".to_string(),
            page_size: 10,
            log_level: None,
            start_screen,
        }
    }

    /// App on the hierarchy screen with `ids` loaded as root clients
    fn app_with_clients(ids: &[EntityId]) -> App {
        let mut app = App::with_startup_config(&config(StartScreen::Hierarchy));
        let key = QueryKey::Clients(PageRequest::first(10));
        assert_eq!(query_keys(app.take_requests()), vec![key.clone()]);
        let clients = ids.iter().copied().map(client).collect();
        deliver(
            &mut app,
            key,
            QueryData::Clients(Page::from_bare(clients, PageRequest::first(10))),
        );
        app
    }

    fn app_with_entries(total: u64) -> App {
        let mut app = App::with_startup_config(&config(StartScreen::TimeEntries));
        let key = QueryKey::TimeEntries(PageRequest::first(10));
        assert_eq!(query_keys(app.take_requests()), vec![key.clone()]);
        deliver(
            &mut app,
            key,
            QueryData::TimeEntries(entries_page(1..=10, total, 0)),
        );
        app
    }

    fn filled_create_form(app: &mut App) {
        app.open_create_form(Some(3));
        let form = app.form.as_mut().unwrap();
        form.comment = "Code review".to_string();
        form.start = "2024-01-15T09:00".to_string();
        form.end = "2024-01-15T10:30".to_string();
    }

    #[test]
    fn test_default_starts_on_hierarchy_without_requests() {
        let mut app = App::default();
        assert_eq!(app.state, AppState::Hierarchy);
        assert_eq!(app.page_size(), DEFAULT_PAGE_SIZE);
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn test_start_screen_new_entry_opens_form() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));
        assert_eq!(app.state, AppState::EntryForm);
        assert_eq!(app.form.as_ref().unwrap().mode, FormMode::Create);
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn test_start_screen_edit_requests_entry() {
        let mut app = App::with_startup_config(&config(StartScreen::EditEntry(7)));
        assert_eq!(app.state, AppState::EntryForm);
        assert_eq!(query_keys(app.take_requests()), vec![QueryKey::TimeEntry(7)]);
        assert!(app.form.as_ref().unwrap().loading);
    }

    #[test]
    fn test_q_quits() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits_from_form() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));
        app.handle_key(ctrl('c'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_help_overlay_intercepts_keys() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Char('?')));
        assert!(app.show_help);

        app.handle_key(key_event(KeyCode::Char('2')));
        assert_eq!(app.state, AppState::Hierarchy);

        app.handle_key(key_event(KeyCode::Esc));
        assert!(!app.show_help);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app_with_clients(&[1, 2, 3]);
        assert_eq!(app.tree_cursor, 0);

        app.handle_key(key_event(KeyCode::Char('k')));
        assert_eq!(app.tree_cursor, 2);

        app.handle_key(key_event(KeyCode::Down));
        assert_eq!(app.tree_cursor, 0);
    }

    #[test]
    fn test_expanding_client_fetches_projects_once() {
        let mut app = app_with_clients(&[1]);
        let key = QueryKey::Projects {
            client_id: 1,
            page: PageRequest::first(10),
        };

        app.handle_key(key_event(KeyCode::Enter));
        assert_eq!(query_keys(app.take_requests()), vec![key.clone()]);
        deliver(
            &mut app,
            key,
            QueryData::Projects(Page::from_bare(vec![project(10, 1)], PageRequest::first(10))),
        );
        assert_eq!(app.tree_rows().len(), 2);

        app.handle_key(key_event(KeyCode::Enter));
        assert_eq!(app.tree_rows().len(), 1);
        app.handle_key(key_event(KeyCode::Enter));
        assert_eq!(app.tree_rows().len(), 2);

        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn test_left_on_child_jumps_to_parent() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Right));
        let key = query_keys(app.take_requests()).remove(0);
        deliver(
            &mut app,
            key,
            QueryData::Projects(Page::from_bare(vec![project(10, 1)], PageRequest::first(10))),
        );

        app.handle_key(key_event(KeyCode::Down));
        assert_eq!(app.tree_cursor, 1);

        app.handle_key(key_event(KeyCode::Left));
        assert_eq!(app.tree_cursor, 0);

        app.handle_key(key_event(KeyCode::Left));
        assert_eq!(app.hierarchy.expand_state(NodeRef::Client(1)), ExpandState::Collapsed);
    }

    #[test]
    fn test_load_more_row_requests_next_page() {
        let ids: Vec<EntityId> = (1..=10).collect();
        let mut app = app_with_clients(&ids);
        let rows = app.tree_rows();
        assert_eq!(rows.len(), 11);

        app.tree_cursor = 10;
        app.handle_key(key_event(KeyCode::Enter));

        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::Clients(PageRequest::new(10, 10))]
        );
    }

    #[test]
    fn test_enter_on_task_opens_prefilled_form() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Enter));
        let key = query_keys(app.take_requests()).remove(0);
        deliver(
            &mut app,
            key,
            QueryData::Projects(Page::from_bare(vec![project(10, 1)], PageRequest::first(10))),
        );
        app.handle_key(key_event(KeyCode::Down));
        app.handle_key(key_event(KeyCode::Enter));
        let key = query_keys(app.take_requests()).remove(0);
        deliver(
            &mut app,
            key,
            QueryData::Tasks(Page::from_bare(vec![task(100)], PageRequest::first(10))),
        );

        app.handle_key(key_event(KeyCode::Down));
        app.handle_key(key_event(KeyCode::Enter));

        assert_eq!(app.state, AppState::EntryForm);
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.task_id, "100");
        assert_eq!(form.focus, FormField::Comment);
    }

    #[test]
    fn test_refresh_clears_tree_and_reloads_root() {
        let mut app = app_with_clients(&[1, 2]);
        app.tree_cursor = 1;

        app.handle_key(key_event(KeyCode::Char('r')));

        assert!(app.hierarchy.clients().is_none());
        assert_eq!(app.tree_cursor, 0);
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::Clients(PageRequest::first(10))]
        );
    }

    #[test]
    fn test_failed_expand_shows_dismissible_banner() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Enter));
        let key = query_keys(app.take_requests()).remove(0);
        let generation = app.cache.running_generation(&key).unwrap();

        app.handle_message(WorkerMessage::QueryFinished {
            key,
            generation,
            result: Err("API Error: 500".to_string()),
        });

        let banner = app.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Failed to load projects: API Error: 500");
        assert_eq!(app.hierarchy.expand_state(NodeRef::Client(1)), ExpandState::Collapsed);

        app.handle_key(key_event(KeyCode::Char('x')));
        assert!(app.banner.is_none());
    }

    #[test]
    fn test_switching_screens_loads_entries_once() {
        let mut app = app_with_clients(&[1]);

        app.handle_key(key_event(KeyCode::Char('2')));
        assert_eq!(app.state, AppState::TimeEntries);
        assert!(app.entries_loading);
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::TimeEntries(PageRequest::first(10))]
        );

        app.handle_key(key_event(KeyCode::Char('1')));
        app.handle_key(key_event(KeyCode::Char('2')));
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn test_entries_paging() {
        let mut app = app_with_entries(25);
        assert_eq!(app.entries_pagination().unwrap().total_pages(), 3);

        app.handle_key(key_event(KeyCode::Left));
        assert_eq!(app.entries_page, 1);
        assert!(app.take_requests().is_empty());

        app.handle_key(key_event(KeyCode::Right));
        assert_eq!(app.entries_page, 2);
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::TimeEntries(PageRequest::new(10, 10))]
        );
    }

    #[test]
    fn test_stale_entries_page_is_ignored() {
        let mut app = app_with_entries(25);
        app.handle_key(key_event(KeyCode::Right));
        app.take_requests();

        deliver(
            &mut app,
            QueryKey::TimeEntries(PageRequest::first(10)),
            QueryData::TimeEntries(entries_page(1..=10, 25, 0)),
        );
        assert!(app.entries_loading);

        deliver(
            &mut app,
            QueryKey::TimeEntries(PageRequest::new(10, 10)),
            QueryData::TimeEntries(entries_page(11..=20, 25, 10)),
        );
        assert!(!app.entries_loading);
        assert_eq!(app.selected_entry().unwrap().id, 11);
    }

    #[test]
    fn test_cached_page_is_applied_without_request() {
        let mut app = app_with_entries(25);
        app.handle_key(key_event(KeyCode::Right));
        let key = query_keys(app.take_requests()).remove(0);
        deliver(
            &mut app,
            key,
            QueryData::TimeEntries(entries_page(11..=20, 25, 10)),
        );

        app.handle_key(key_event(KeyCode::Left));

        assert!(app.take_requests().is_empty());
        assert!(!app.entries_loading);
        assert_eq!(app.selected_entry().unwrap().id, 1);
    }

    #[test]
    fn test_entry_selection_wraps() {
        let mut app = app_with_entries(10);
        app.handle_key(key_event(KeyCode::Up));
        assert_eq!(app.entries_selected, 9);
        app.handle_key(key_event(KeyCode::Char('j')));
        assert_eq!(app.entries_selected, 0);
    }

    #[test]
    fn test_edit_selected_entry_loads_form() {
        let mut app = app_with_entries(10);
        app.handle_key(key_event(KeyCode::Down));
        app.handle_key(key_event(KeyCode::Char('e')));

        assert_eq!(app.state, AppState::EntryForm);
        assert_eq!(query_keys(app.take_requests()), vec![QueryKey::TimeEntry(2)]);

        deliver(&mut app, QueryKey::TimeEntry(2), QueryData::TimeEntry(entry(2)));

        let form = app.form.as_ref().unwrap();
        assert!(!form.loading);
        assert_eq!(form.comment, "Entry 2");
    }

    #[test]
    fn test_typing_in_form_does_not_switch_screens() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));

        app.handle_key(key_event(KeyCode::Char('1')));
        app.handle_key(key_event(KeyCode::Char('2')));
        app.handle_key(key_event(KeyCode::Tab));
        app.handle_key(key_event(KeyCode::Char('q')));

        assert_eq!(app.state, AppState::EntryForm);
        assert!(!app.should_quit);
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.task_id, "12");
        assert_eq!(form.comment, "q");
    }

    #[test]
    fn test_invalid_submit_shows_error_without_request() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));

        app.handle_key(ctrl('s'));

        assert!(app.take_requests().is_empty());
        assert_eq!(
            app.form.as_ref().unwrap().error.as_deref(),
            Some("Please select a task")
        );
    }

    #[test]
    fn test_submit_on_submit_field_queues_create() {
        let mut app = App::default();
        filled_create_form(&mut app);
        app.form.as_mut().unwrap().focus = FormField::Submit;

        app.handle_key(key_event(KeyCode::Enter));

        let requests = app.take_requests();
        assert_eq!(requests.len(), 1);
        match &requests[0] {
            Request::Mutation {
                mutation: Mutation::Create(input),
                ..
            } => {
                assert_eq!(input.task_id, 3);
                assert_eq!(input.comment, "Code review");
            }
            other => panic!("unexpected request: {:?}", other),
        }
        assert!(app.form.as_ref().unwrap().submitting);

        app.handle_key(ctrl('s'));
        assert!(app.take_requests().is_empty());
    }

    #[test]
    fn test_successful_create_returns_to_list_with_banner() {
        let mut app = App::default();
        filled_create_form(&mut app);
        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);

        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Ok(entry(7)),
        });

        assert_eq!(app.state, AppState::TimeEntries);
        assert!(app.form.is_none());
        let banner = app.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Success);
        assert_eq!(banner.message, "Time entry #7 created successfully!");
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::TimeEntries(PageRequest::first(10))]
        );
    }

    #[test]
    fn test_update_invalidates_cached_entries() {
        let mut app = app_with_entries(25);
        app.handle_key(key_event(KeyCode::Enter));
        app.take_requests();
        deliver(&mut app, QueryKey::TimeEntry(1), QueryData::TimeEntry(entry(1)));

        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);
        assert!(matches!(mutation, Mutation::Update { id: 1, .. }));
        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Ok(entry(1)),
        });

        assert_eq!(app.state, AppState::TimeEntries);
        assert_eq!(
            app.banner.as_ref().unwrap().message,
            "Time entry #1 updated successfully!"
        );
        // The first page was cached before, so it must be fetched again
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::TimeEntries(PageRequest::first(10))]
        );
    }

    #[test]
    fn test_failed_submit_stays_in_form() {
        let mut app = App::default();
        filled_create_form(&mut app);
        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);

        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Err("Task not found".to_string()),
        });

        assert_eq!(app.state, AppState::EntryForm);
        let form = app.form.as_ref().unwrap();
        assert!(!form.submitting);
        assert_eq!(form.error.as_deref(), Some("Task not found"));
    }

    #[test]
    fn test_create_while_list_loading_refetches_list() {
        let mut app = App::with_startup_config(&config(StartScreen::TimeEntries));
        let list_key = QueryKey::TimeEntries(PageRequest::first(10));
        assert_eq!(query_keys(app.take_requests()), vec![list_key.clone()]);
        let old_generation = app.cache.running_generation(&list_key).unwrap();

        filled_create_form(&mut app);
        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);
        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Ok(entry(99)),
        });

        // The running list request predates the new entry
        assert_eq!(query_keys(app.take_requests()), vec![list_key.clone()]);

        deliver_generation(
            &mut app,
            list_key.clone(),
            old_generation,
            QueryData::TimeEntries(entries_page(1..=1, 1, 0)),
        );
        assert!(app.entries_loading);
        assert!(app.entries.is_none());

        let mut fresh = entries_page(1..=1, 2, 0);
        fresh.data.insert(0, entry(99));
        deliver(&mut app, list_key, QueryData::TimeEntries(fresh));

        assert!(!app.entries_loading);
        assert_eq!(app.selected_entry().unwrap().id, 99);
    }

    #[test]
    fn test_late_failure_does_not_touch_new_form() {
        let mut app = App::default();
        filled_create_form(&mut app);
        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);

        app.handle_key(key_event(KeyCode::Esc));
        app.handle_key(key_event(KeyCode::Char('n')));
        app.handle_key(key_event(KeyCode::Char('4')));

        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Err("Task not found".to_string()),
        });

        assert_eq!(app.state, AppState::EntryForm);
        let form = app.form.as_ref().unwrap();
        assert_eq!(form.task_id, "4");
        assert!(form.error.is_none());
        let banner = app.banner.as_ref().unwrap();
        assert_eq!(banner.kind, BannerKind::Error);
        assert_eq!(banner.message, "Failed to save time entry: Task not found");
    }

    #[test]
    fn test_late_success_keeps_new_form_open() {
        let mut app = App::default();
        filled_create_form(&mut app);
        app.handle_key(ctrl('s'));
        let (submission, mutation) = take_mutation(&mut app);

        app.handle_key(key_event(KeyCode::Esc));
        app.take_requests();
        app.handle_key(key_event(KeyCode::Char('n')));
        app.handle_key(key_event(KeyCode::Char('4')));

        app.handle_message(WorkerMessage::MutationFinished {
            submission,
            mutation,
            result: Ok(entry(7)),
        });

        assert_eq!(app.state, AppState::EntryForm);
        assert_eq!(app.form.as_ref().unwrap().task_id, "4");
        assert_eq!(
            app.banner.as_ref().unwrap().message,
            "Time entry #7 created successfully!"
        );

        // Leaving the form loads the list again
        app.handle_key(key_event(KeyCode::Esc));
        assert_eq!(
            query_keys(app.take_requests()),
            vec![QueryKey::TimeEntries(PageRequest::first(10))]
        );
    }

    #[test]
    fn test_refresh_drops_running_fetches() {
        let mut app = app_with_clients(&[1]);
        app.handle_key(key_event(KeyCode::Char('2')));
        let list_key = query_keys(app.take_requests()).remove(0);
        let old_generation = app.cache.running_generation(&list_key).unwrap();
        app.handle_key(key_event(KeyCode::Char('1')));

        app.handle_key(key_event(KeyCode::Char('r')));
        app.take_requests();
        deliver_generation(
            &mut app,
            list_key.clone(),
            old_generation,
            QueryData::TimeEntries(entries_page(1..=10, 10, 0)),
        );
        assert!(app.entries.is_none());

        app.handle_key(key_event(KeyCode::Char('2')));
        assert_eq!(query_keys(app.take_requests()), vec![list_key]);
    }

    #[test]
    fn test_escape_cancels_form() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));
        app.handle_key(key_event(KeyCode::Esc));

        assert_eq!(app.state, AppState::TimeEntries);
        assert!(app.form.is_none());
    }

    #[test]
    fn test_task_picker_fills_task_field() {
        let mut app = App::with_startup_config(&config(StartScreen::NewEntry));
        app.handle_key(ctrl('t'));
        assert_eq!(query_keys(app.take_requests()), vec![QueryKey::AllTasks]);
        assert!(app.form.as_ref().unwrap().picker.as_ref().unwrap().loading);

        let options = [4, 9]
            .into_iter()
            .map(|id| TaskOption {
                task: task(id),
                project_name: "Website".to_string(),
                client_name: "Acme".to_string(),
            })
            .collect();
        deliver(&mut app, QueryKey::AllTasks, QueryData::AllTasks(options));

        app.handle_key(key_event(KeyCode::Char('j')));
        app.handle_key(key_event(KeyCode::Enter));

        let form = app.form.as_ref().unwrap();
        assert!(form.picker.is_none());
        assert_eq!(form.task_id, "9");
    }

    #[test]
    fn test_tick_expires_success_banner() {
        let mut app = App::default();
        let now = Instant::now();
        app.banner = Some(Banner::success("done", now));

        app.tick(now + Duration::from_secs(1));
        assert!(app.banner.is_some());

        app.tick(now + Duration::from_secs(6));
        assert!(app.banner.is_none());
    }
}
