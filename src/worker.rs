//! Background request execution
//!
//! Each API request runs in its own tokio task. Results come back to the
//! event loop as [`WorkerMessage`]s over an mpsc channel, so the application
//! state is only ever touched from the loop itself.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::QueryKey;
use crate::data::{
    ApiError, Client, EntityId, MemtimeClient, Page, Project, Task, TaskOption, TimeEntry,
    TimeEntryInput,
};

/// Capacity of the result channel
const CHANNEL_CAPACITY: usize = 64;

/// Response payload of a query, tagged by resource
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Clients(Page<Client>),
    Projects(Page<Project>),
    Tasks(Page<Task>),
    TimeEntries(Page<TimeEntry>),
    TimeEntry(TimeEntry),
    AllTasks(Vec<TaskOption>),
}

/// A write against the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create(TimeEntryInput),
    Update { id: EntityId, input: TimeEntryInput },
}

impl Mutation {
    /// Past-tense verb for banners ("created", "updated")
    pub fn verb(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "created",
            Mutation::Update { .. } => "updated",
        }
    }
}

/// Work the event loop should hand to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch `key`; the generation comes back with the result
    Query { key: QueryKey, generation: u64 },
    /// Save a time entry; `submission` identifies the form that sent it
    Mutation { submission: u64, mutation: Mutation },
}

/// Messages sent from request tasks to the event loop
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// A query finished, successfully or not
    QueryFinished {
        key: QueryKey,
        generation: u64,
        result: Result<QueryData, String>,
    },
    /// A mutation finished, successfully or not
    MutationFinished {
        submission: u64,
        mutation: Mutation,
        result: Result<TimeEntry, String>,
    },
}

/// Executes a query against the API
pub async fn run_query(client: &MemtimeClient, key: &QueryKey) -> Result<QueryData, ApiError> {
    let data = match key {
        QueryKey::Clients(page) => QueryData::Clients(client.list_clients(*page).await?),
        QueryKey::Projects { client_id, page } => {
            QueryData::Projects(client.list_projects(*client_id, *page).await?)
        }
        QueryKey::Tasks { project_id, page } => {
            QueryData::Tasks(client.list_tasks(*project_id, *page).await?)
        }
        QueryKey::TimeEntries(page) => {
            QueryData::TimeEntries(client.list_time_entries(*page).await?)
        }
        QueryKey::TimeEntry(id) => QueryData::TimeEntry(client.get_time_entry(*id).await?),
        QueryKey::AllTasks => QueryData::AllTasks(client.all_tasks().await?),
    };
    Ok(data)
}

/// Executes a mutation against the API
pub async fn run_mutation(client: &MemtimeClient, mutation: &Mutation) -> Result<TimeEntry, ApiError> {
    match mutation {
        Mutation::Create(input) => client.create_time_entry(input).await,
        Mutation::Update { id, input } => client.update_time_entry(*id, input).await,
    }
}

/// Handle for dispatching requests and receiving their results
pub struct Worker {
    client: MemtimeClient,
    sender: mpsc::Sender<WorkerMessage>,
    /// Channel for receiving results
    pub receiver: mpsc::Receiver<WorkerMessage>,
}

impl Worker {
    pub fn new(client: MemtimeClient) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        Self {
            client,
            sender,
            receiver,
        }
    }

    /// Spawns a task for `request`
    pub fn dispatch(&self, request: Request) {
        match request {
            Request::Query { key, generation } => self.spawn_query(key, generation),
            Request::Mutation {
                submission,
                mutation,
            } => self.spawn_mutation(submission, mutation),
        }
    }

    fn spawn_query(&self, key: QueryKey, generation: u64) {
        let client = self.client.clone();
        let tx = self.sender.clone();
        debug!(?key, generation, "query dispatched");

        tokio::spawn(async move {
            let result = run_query(&client, &key).await.map_err(|e| {
                warn!(?key, error = %e, "query failed");
                e.to_string()
            });
            let _ = tx
                .send(WorkerMessage::QueryFinished {
                    key,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn spawn_mutation(&self, submission: u64, mutation: Mutation) {
        let client = self.client.clone();
        let tx = self.sender.clone();
        debug!(submission, verb = mutation.verb(), "mutation dispatched");

        tokio::spawn(async move {
            let result = run_mutation(&client, &mutation).await.map_err(|e| {
                warn!(error = %e, "mutation failed");
                e.to_string()
            });
            let _ = tx
                .send(WorkerMessage::MutationFinished {
                    submission,
                    mutation,
                    result,
                })
                .await;
        });
    }

    /// Takes a finished result without blocking
    pub fn try_recv(&mut self) -> Option<WorkerMessage> {
        self.receiver.try_recv().ok()
    }
}
