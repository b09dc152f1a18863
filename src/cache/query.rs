//! Key-based request memoization with time-based invalidation
//!
//! Provides a `QueryCache` that remembers responses per [`QueryKey`], tracks
//! which keys are currently being fetched, and supports invalidating whole
//! groups of keys after a mutation.
//!
//! Every fetch gets a generation number when it starts. Invalidation
//! supersedes running fetches, so a response that comes back with an old
//! generation is dropped instead of being stored as fresh.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use crate::data::{EntityId, PageRequest};

/// Default time a response is served without refetching
const DEFAULT_STALE_MINUTES: i64 = 5;

/// Default time an unused response is kept before eviction
const DEFAULT_GC_MINUTES: i64 = 30;

/// The task picker walks the whole hierarchy, so it is kept fresh longer
const ALL_TASKS_STALE_MINUTES: i64 = 10;

/// Identifies a single API request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// A page of clients
    Clients(PageRequest),
    /// A page of one client's projects
    Projects {
        client_id: EntityId,
        page: PageRequest,
    },
    /// A page of one project's tasks
    Tasks {
        project_id: EntityId,
        page: PageRequest,
    },
    /// A page of time entries
    TimeEntries(PageRequest),
    /// A single time entry
    TimeEntry(EntityId),
    /// Every task with its project and client names
    AllTasks,
}

/// Group of keys that are invalidated together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    Clients,
    Projects,
    Tasks,
    /// Time entry lists and single entries
    TimeEntries,
    /// Every key
    All,
}

impl QueryKey {
    /// The scope this key belongs to
    pub fn scope(&self) -> QueryScope {
        match self {
            QueryKey::Clients(_) => QueryScope::Clients,
            QueryKey::Projects { .. } => QueryScope::Projects,
            QueryKey::Tasks { .. } | QueryKey::AllTasks => QueryScope::Tasks,
            QueryKey::TimeEntries(_) | QueryKey::TimeEntry(_) => QueryScope::TimeEntries,
        }
    }

    /// Whether this key falls within `scope`
    pub fn in_scope(&self, scope: QueryScope) -> bool {
        scope == QueryScope::All || self.scope() == scope
    }
}

/// A stored response
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    data: V,
    cached_at: DateTime<Utc>,
}

/// Result of reading from the cache, including freshness metadata
#[derive(Debug, Clone)]
pub struct CachedData<V> {
    /// The cached data
    pub data: V,
    /// When the data was stored
    pub cached_at: DateTime<Utc>,
    /// Whether the stale time has passed
    pub is_stale: bool,
}

/// What the caller should do about a request
#[derive(Debug, Clone)]
pub enum Lookup<V> {
    /// A fresh response exists, use it without fetching
    Fresh(V),
    /// An identical request is already running, wait for its result
    InFlight,
    /// No usable response, the key is now in flight under this generation
    Fetch(u64),
}

/// In-memory response cache with stale and garbage-collection times
#[derive(Debug, Clone)]
pub struct QueryCache<V> {
    entries: HashMap<QueryKey, CacheEntry<V>>,
    /// Generation of the fetch currently running for each key
    in_flight: HashMap<QueryKey, u64>,
    next_generation: u64,
    stale_time: Duration,
    gc_time: Duration,
}

impl<V: Clone> QueryCache<V> {
    /// Creates a cache with the default 5 minute stale and 30 minute gc times
    pub fn new() -> Self {
        Self::with_times(
            Duration::minutes(DEFAULT_STALE_MINUTES),
            Duration::minutes(DEFAULT_GC_MINUTES),
        )
    }

    /// Creates a cache with custom stale and gc times
    pub fn with_times(stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            next_generation: 1,
            stale_time,
            gc_time,
        }
    }

    /// Stale time that applies to `key`
    pub fn stale_time_for(&self, key: &QueryKey) -> Duration {
        match key {
            QueryKey::AllTasks => self.stale_time.max(Duration::minutes(ALL_TASKS_STALE_MINUTES)),
            _ => self.stale_time,
        }
    }

    /// Reads an entry as of `now`, fresh or stale
    pub fn read_at(&self, key: &QueryKey, now: DateTime<Utc>) -> Option<CachedData<V>> {
        let entry = self.entries.get(key)?;
        let is_stale = now - entry.cached_at >= self.stale_time_for(key);
        Some(CachedData {
            data: entry.data.clone(),
            cached_at: entry.cached_at,
            is_stale,
        })
    }

    /// Reads an entry as of now
    pub fn read(&self, key: &QueryKey) -> Option<CachedData<V>> {
        self.read_at(key, Utc::now())
    }

    /// Decides whether `key` needs a fetch as of `now`
    ///
    /// Returns [`Lookup::Fetch`] at most once per key until the fetch is
    /// completed with [`store_at`](Self::store_at) or [`fail`](Self::fail),
    /// or superseded by [`invalidate`](Self::invalidate).
    pub fn begin_at(&mut self, key: &QueryKey, now: DateTime<Utc>) -> Lookup<V> {
        if let Some(cached) = self.read_at(key, now) {
            if !cached.is_stale {
                debug!(?key, "cache hit");
                return Lookup::Fresh(cached.data);
            }
        }
        if self.in_flight.contains_key(key) {
            debug!(?key, "request already in flight");
            return Lookup::InFlight;
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.in_flight.insert(key.clone(), generation);
        Lookup::Fetch(generation)
    }

    /// Decides whether `key` needs a fetch as of now
    pub fn begin(&mut self, key: &QueryKey) -> Lookup<V> {
        self.begin_at(key, Utc::now())
    }

    /// Takes the in-flight mark of `key` if it belongs to `generation`
    fn finish(&mut self, key: &QueryKey, generation: u64) -> bool {
        if self.in_flight.get(key) == Some(&generation) {
            self.in_flight.remove(key);
            true
        } else {
            debug!(?key, generation, "superseded response dropped");
            false
        }
    }

    /// Stores a response received at `now` and clears the in-flight mark
    ///
    /// Returns false, storing nothing, when `generation` is not the fetch
    /// currently running for `key`.
    pub fn store_at(&mut self, key: QueryKey, generation: u64, data: V, now: DateTime<Utc>) -> bool {
        if !self.finish(&key, generation) {
            return false;
        }
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: now,
            },
        );
        true
    }

    /// Stores a response received now
    pub fn store(&mut self, key: QueryKey, generation: u64, data: V) -> bool {
        self.store_at(key, generation, data, Utc::now())
    }

    /// Clears the in-flight mark of a failed request
    ///
    /// Returns false when the failed fetch had already been superseded.
    pub fn fail(&mut self, key: &QueryKey, generation: u64) -> bool {
        self.finish(key, generation)
    }

    /// Generation of the fetch running for `key`, if any
    pub fn running_generation(&self, key: &QueryKey) -> Option<u64> {
        self.in_flight.get(key).copied()
    }

    /// Whether a request for `key` is running
    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        self.running_generation(key).is_some()
    }

    /// Drops every stored entry in `scope` and supersedes its running fetches
    ///
    /// The next [`begin`](Self::begin) for such a key fetches again.
    pub fn invalidate(&mut self, scope: QueryScope) {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.in_scope(scope));
        self.in_flight.retain(|key, _| !key.in_scope(scope));
        debug!(?scope, dropped = before - self.entries.len(), "cache invalidated");
    }

    /// Drops every entry and every in-flight mark
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
    }

    /// Evicts entries stored longer than the gc time before `now`
    pub fn collect_garbage_at(&mut self, now: DateTime<Utc>) {
        let gc_time = self.gc_time;
        self.entries.retain(|_, entry| now - entry.cached_at < gc_time);
    }

    /// Evicts entries stored longer than the gc time
    pub fn collect_garbage(&mut self) {
        self.collect_garbage_at(Utc::now());
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
