//! Query cache for API responses
//!
//! This module provides an in-memory cache keyed by the request that produced
//! each response. Entries are fresh for a configurable stale time, are kept
//! for a longer garbage-collection time, and identical requests that are
//! already running are not issued twice.

mod query;

pub use query::{CachedData, Lookup, QueryCache, QueryKey, QueryScope};
