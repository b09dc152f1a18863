//! Incremental loading of the client → project → task tree
//!
//! Each expandable node (the root client list, every client, every project)
//! owns a [`NodeState`] that remembers the children fetched so far and the
//! total the server reported. The tree never performs I/O itself: operations
//! return the [`QueryKey`] that must be fetched, and the result is handed
//! back through the `apply_*` methods once it arrives.
//!
//! Per node the lifecycle is:
//!
//! ```text
//! Collapsed --expand--> Loading --ok--> Expanded <--toggle--> Collapsed
//!                          |                |  ^
//!                         err          load more |
//!                          v                v  | ok/err
//!                      Collapsed        LoadingMore
//! ```
//!
//! Only the first expansion fetches; later toggles flip visibility.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::QueryKey;
use crate::data::{Client, EntityId, Page, PageRequest, Project, Task};

/// Default number of children requested per fetch
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Client,
    Project,
    Task,
}

impl NodeKind {
    /// Human-readable label for the node type
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Client => "Client",
            NodeKind::Project => "Project",
            NodeKind::Task => "Task",
        }
    }

    /// Tasks are leaves, everything else has children
    pub fn can_expand(&self) -> bool {
        !matches!(self, NodeKind::Task)
    }
}

/// An expandable node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// A client, whose children are projects
    Client(EntityId),
    /// A project, whose children are tasks
    Project(EntityId),
}

/// A list that can be extended with "load more"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListRef {
    /// The top-level client list
    Root,
    /// The children of a node
    Children(NodeRef),
}

/// Loaded children of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState<T> {
    /// Children fetched so far, in server order
    pub items: Vec<T>,
    /// Count reported by the server (possibly a sentinel)
    pub total: u64,
    /// Number of children fetched so far
    pub loaded: u64,
}

impl<T> NodeState<T> {
    /// Creates the state from the first page
    pub fn from_page(page: Page<T>) -> Self {
        let loaded = page.count();
        Self {
            total: page.total,
            loaded,
            items: page.data,
        }
    }

    /// Whether the server has more children than have been loaded
    pub fn has_more(&self) -> bool {
        self.loaded < self.total
    }

    /// Appends a follow-up page, keeping every earlier item
    ///
    /// Pages that do not start where the previous one ended are rejected.
    pub fn append(&mut self, page: Page<T>) -> bool {
        if page.offset != self.loaded {
            return false;
        }
        self.loaded += page.count();
        self.total = page.total;
        self.items.extend(page.data);
        true
    }
}

/// Whether a fetch is running for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FetchPhase {
    #[default]
    Idle,
    Loading,
    LoadingMore,
}

/// Observable state of an expandable node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandState {
    Collapsed,
    Loading,
    Expanded,
    LoadingMore,
}

/// Tree bookkeeping for one expandable node
#[derive(Debug, Clone)]
struct Branch<T> {
    expanded: bool,
    phase: FetchPhase,
    children: Option<NodeState<T>>,
}

impl<T> Default for Branch<T> {
    fn default() -> Self {
        Self {
            expanded: false,
            phase: FetchPhase::Idle,
            children: None,
        }
    }
}

impl<T> Branch<T> {
    fn expand_state(&self) -> ExpandState {
        match (self.phase, self.expanded) {
            (FetchPhase::Loading, _) => ExpandState::Loading,
            (FetchPhase::LoadingMore, _) => ExpandState::LoadingMore,
            (FetchPhase::Idle, true) => ExpandState::Expanded,
            (FetchPhase::Idle, false) => ExpandState::Collapsed,
        }
    }

    /// Toggles visibility, returning true when a first fetch must start
    fn toggle(&mut self) -> bool {
        match (self.phase, &self.children) {
            (FetchPhase::Loading, _) => false,
            (_, Some(_)) => {
                self.expanded = !self.expanded;
                false
            }
            (_, None) => {
                self.phase = FetchPhase::Loading;
                true
            }
        }
    }

    fn collapse(&mut self) {
        if self.children.is_some() {
            self.expanded = false;
        }
    }

    /// Starts a "load more", returning the offset to fetch from
    fn begin_load_more(&mut self) -> Option<u64> {
        if self.phase != FetchPhase::Idle {
            return None;
        }
        let children = self.children.as_ref()?;
        if !children.has_more() {
            return None;
        }
        self.phase = FetchPhase::LoadingMore;
        Some(children.loaded)
    }

    /// Applies the page of the running fetch
    ///
    /// A page that does not line up ends the fetch like a failure would.
    fn apply(&mut self, page: Page<T>) -> bool {
        match self.phase {
            FetchPhase::Loading if page.offset == 0 => {
                self.children = Some(NodeState::from_page(page));
                self.expanded = true;
                self.phase = FetchPhase::Idle;
                true
            }
            FetchPhase::LoadingMore => {
                let appended = self
                    .children
                    .as_mut()
                    .map(|children| children.append(page))
                    .unwrap_or(false);
                self.phase = FetchPhase::Idle;
                appended
            }
            FetchPhase::Loading => {
                self.fail();
                false
            }
            FetchPhase::Idle => false,
        }
    }

    fn fail(&mut self) {
        match self.phase {
            FetchPhase::Loading => {
                self.phase = FetchPhase::Idle;
                self.expanded = false;
            }
            FetchPhase::LoadingMore => self.phase = FetchPhase::Idle,
            FetchPhase::Idle => {}
        }
    }
}

/// What a visible row shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    /// An entity row
    Node {
        kind: NodeKind,
        id: EntityId,
        name: String,
        /// `None` for leaves
        state: Option<ExpandState>,
    },
    /// "Load more" control for a list
    LoadMore {
        list: ListRef,
        loaded: u64,
        total: u64,
        loading: bool,
    },
    /// Placeholder for an expanded node without children
    Empty { kind: NodeKind },
}

/// A row of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Nesting level, 0 for clients
    pub depth: u16,
    pub kind: RowKind,
}

/// The whole client → project → task tree
#[derive(Debug, Clone)]
pub struct Hierarchy {
    page_size: u64,
    root: Branch<Client>,
    projects: HashMap<EntityId, Branch<Project>>,
    tasks: HashMap<EntityId, Branch<Task>>,
}

impl Hierarchy {
    pub fn new(page_size: u64) -> Self {
        Self {
            page_size: page_size.max(1),
            root: Branch::default(),
            projects: HashMap::new(),
            tasks: HashMap::new(),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Discards everything, as a full refresh does
    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }

    /// Starts loading the first page of clients
    ///
    /// Returns `None` if the root is already loaded or loading.
    pub fn load_root(&mut self) -> Option<QueryKey> {
        if self.root.children.is_some() || self.root.phase != FetchPhase::Idle {
            return None;
        }
        self.root.phase = FetchPhase::Loading;
        Some(QueryKey::Clients(PageRequest::first(self.page_size)))
    }

    /// Loaded root clients, if the first page arrived
    pub fn clients(&self) -> Option<&NodeState<Client>> {
        self.root.children.as_ref()
    }

    /// Whether the first page of clients is being fetched
    pub fn is_root_loading(&self) -> bool {
        self.root.phase == FetchPhase::Loading
    }

    /// Loaded projects of a client
    pub fn projects(&self, client_id: EntityId) -> Option<&NodeState<Project>> {
        self.projects.get(&client_id)?.children.as_ref()
    }

    /// Loaded tasks of a project
    pub fn tasks(&self, project_id: EntityId) -> Option<&NodeState<Task>> {
        self.tasks.get(&project_id)?.children.as_ref()
    }

    /// Current state of an expandable node
    pub fn expand_state(&self, node: NodeRef) -> ExpandState {
        match node {
            NodeRef::Client(id) => self.projects.get(&id).map(Branch::expand_state),
            NodeRef::Project(id) => self.tasks.get(&id).map(Branch::expand_state),
        }
        .unwrap_or(ExpandState::Collapsed)
    }

    /// Toggles a node open or closed
    ///
    /// The first expansion returns the key of the fetch to run. Every later
    /// toggle only flips visibility and returns `None`.
    pub fn toggle(&mut self, node: NodeRef) -> Option<QueryKey> {
        let first_page = PageRequest::first(self.page_size);
        let key = match node {
            NodeRef::Client(client_id) => self
                .projects
                .entry(client_id)
                .or_default()
                .toggle()
                .then_some(QueryKey::Projects {
                    client_id,
                    page: first_page,
                }),
            NodeRef::Project(project_id) => self
                .tasks
                .entry(project_id)
                .or_default()
                .toggle()
                .then_some(QueryKey::Tasks {
                    project_id,
                    page: first_page,
                }),
        };
        if key.is_some() {
            debug!(?node, "first expansion");
        }
        key
    }

    /// Expands a node, fetching its children on first use
    pub fn expand(&mut self, node: NodeRef) -> Option<QueryKey> {
        match self.expand_state(node) {
            ExpandState::Collapsed => self.toggle(node),
            _ => None,
        }
    }

    /// Collapses a node without discarding its children
    pub fn collapse(&mut self, node: NodeRef) {
        match node {
            NodeRef::Client(id) => {
                if let Some(branch) = self.projects.get_mut(&id) {
                    branch.collapse();
                }
            }
            NodeRef::Project(id) => {
                if let Some(branch) = self.tasks.get_mut(&id) {
                    branch.collapse();
                }
            }
        }
    }

    /// Requests the next page of a list
    ///
    /// Returns `None` when nothing more exists or a fetch is already running.
    pub fn load_more(&mut self, list: ListRef) -> Option<QueryKey> {
        let limit = self.page_size;
        match list {
            ListRef::Root => {
                let offset = self.root.begin_load_more()?;
                Some(QueryKey::Clients(PageRequest::new(limit, offset)))
            }
            ListRef::Children(NodeRef::Client(client_id)) => {
                let offset = self.projects.get_mut(&client_id)?.begin_load_more()?;
                Some(QueryKey::Projects {
                    client_id,
                    page: PageRequest::new(limit, offset),
                })
            }
            ListRef::Children(NodeRef::Project(project_id)) => {
                let offset = self.tasks.get_mut(&project_id)?.begin_load_more()?;
                Some(QueryKey::Tasks {
                    project_id,
                    page: PageRequest::new(limit, offset),
                })
            }
        }
    }

    /// Applies a page of clients; returns false if it was not expected
    pub fn apply_clients(&mut self, page: Page<Client>) -> bool {
        self.root.apply(page)
    }

    /// Applies a page of a client's projects
    pub fn apply_projects(&mut self, client_id: EntityId, page: Page<Project>) -> bool {
        self.projects
            .get_mut(&client_id)
            .map(|branch| branch.apply(page))
            .unwrap_or(false)
    }

    /// Applies a page of a project's tasks
    pub fn apply_tasks(&mut self, project_id: EntityId, page: Page<Task>) -> bool {
        self.tasks
            .get_mut(&project_id)
            .map(|branch| branch.apply(page))
            .unwrap_or(false)
    }

    /// Rolls back the fetch identified by `key` after an error
    pub fn fail(&mut self, key: &QueryKey) {
        match key {
            QueryKey::Clients(_) => self.root.fail(),
            QueryKey::Projects { client_id, .. } => {
                if let Some(branch) = self.projects.get_mut(client_id) {
                    branch.fail();
                }
            }
            QueryKey::Tasks { project_id, .. } => {
                if let Some(branch) = self.tasks.get_mut(project_id) {
                    branch.fail();
                }
            }
            _ => {}
        }
    }

    /// Flattens the visible part of the tree into display rows
    pub fn visible_rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        let Some(clients) = self.root.children.as_ref() else {
            return rows;
        };

        for client in &clients.items {
            let branch = self.projects.get(&client.id);
            rows.push(node_row(0, NodeKind::Client, client.id, &client.name, branch));

            let Some(projects) = expanded_children(branch) else {
                continue;
            };
            if projects.items.is_empty() {
                rows.push(TreeRow {
                    depth: 1,
                    kind: RowKind::Empty {
                        kind: NodeKind::Project,
                    },
                });
            }
            for project in &projects.items {
                let branch = self.tasks.get(&project.id);
                rows.push(node_row(1, NodeKind::Project, project.id, &project.name, branch));

                let Some(tasks) = expanded_children(branch) else {
                    continue;
                };
                if tasks.items.is_empty() {
                    rows.push(TreeRow {
                        depth: 2,
                        kind: RowKind::Empty {
                            kind: NodeKind::Task,
                        },
                    });
                }
                for task in &tasks.items {
                    rows.push(TreeRow {
                        depth: 2,
                        kind: RowKind::Node {
                            kind: NodeKind::Task,
                            id: task.id,
                            name: task.name.clone(),
                            state: None,
                        },
                    });
                }
                if let Some(row) = load_more_row(2, ListRef::Children(NodeRef::Project(project.id)), branch) {
                    rows.push(row);
                }
            }
            if let Some(row) = load_more_row(1, ListRef::Children(NodeRef::Client(client.id)), branch) {
                rows.push(row);
            }
        }

        if let Some(row) = load_more_row(0, ListRef::Root, Some(&self.root)) {
            rows.push(row);
        }
        rows
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

fn node_row<T>(
    depth: u16,
    kind: NodeKind,
    id: EntityId,
    name: &str,
    branch: Option<&Branch<T>>,
) -> TreeRow {
    TreeRow {
        depth,
        kind: RowKind::Node {
            kind,
            id,
            name: name.to_string(),
            state: Some(
                branch
                    .map(Branch::expand_state)
                    .unwrap_or(ExpandState::Collapsed),
            ),
        },
    }
}

fn expanded_children<T>(branch: Option<&Branch<T>>) -> Option<&NodeState<T>> {
    let branch = branch?;
    if !branch.expanded {
        return None;
    }
    branch.children.as_ref()
}

fn load_more_row<T>(depth: u16, list: ListRef, branch: Option<&Branch<T>>) -> Option<TreeRow> {
    let branch = branch?;
    if list != ListRef::Root && !branch.expanded {
        return None;
    }
    let children = branch.children.as_ref()?;
    if !children.has_more() {
        return None;
    }
    Some(TreeRow {
        depth,
        kind: RowKind::LoadMore {
            list,
            loaded: children.loaded,
            total: children.total,
            loading: branch.phase == FetchPhase::LoadingMore,
        },
    })
}
