//! Pagination requests and response normalization
//!
//! The API answers list endpoints either with a bare JSON array or with a
//! `{data, total, limit, offset}` envelope depending on endpoint and version.
//! Everything above this module only ever sees a normalized [`Page`].

use serde::{Deserialize, Serialize};

/// Window requested from a list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items, 0 meaning "server default"
    pub limit: u64,
    /// Number of items to skip
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// First page of the given size
    pub fn first(limit: u64) -> Self {
        Self { limit, offset: 0 }
    }

    /// Query string for this window, without the leading `?`
    ///
    /// Zero values are omitted, so the first page of an unlimited request
    /// produces an empty string.
    pub fn query_string(&self) -> String {
        let mut params = Vec::with_capacity(2);
        if self.limit > 0 {
            params.push(format!("limit={}", self.limit));
        }
        if self.offset > 0 {
            params.push(format!("offset={}", self.offset));
        }
        params.join("&")
    }

    /// Appends this window's query string to `path`
    pub fn apply_to(&self, path: &str) -> String {
        let query = self.query_string();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        }
    }
}

/// A normalized page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items in this page
    pub data: Vec<T>,
    /// Total item count, possibly the `offset + count + 1` sentinel
    pub total: u64,
    /// Limit the page was fetched with
    pub limit: u64,
    /// Offset the page was fetched at
    pub offset: u64,
}

impl<T> Page<T> {
    /// Builds a page from a bare array that carries no total
    ///
    /// A full page (`count == limit`) is assumed to have a successor, which
    /// is signalled by a total one past the items seen so far. A short page
    /// is exact.
    pub fn from_bare(data: Vec<T>, request: PageRequest) -> Self {
        let count = data.len() as u64;
        let seen = request.offset + count;
        let total = if request.limit > 0 && count == request.limit {
            seen + 1
        } else {
            seen
        };
        Self {
            data,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }

    /// Number of items in this page
    pub fn count(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether items exist beyond this page
    pub fn has_more(&self) -> bool {
        self.offset + self.count() < self.total
    }
}

/// Raw list body as sent by the server
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PageBody<T> {
    Bare(Vec<T>),
    Envelope {
        data: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        limit: Option<u64>,
        #[serde(default)]
        offset: Option<u64>,
    },
}

impl<T> PageBody<T> {
    /// Normalizes the body against the request that produced it
    pub(crate) fn normalize(self, request: PageRequest) -> Page<T> {
        match self {
            PageBody::Bare(data) => Page::from_bare(data, request),
            PageBody::Envelope {
                data,
                total: Some(total),
                limit,
                offset,
            } => Page {
                data,
                total,
                limit: limit.unwrap_or(request.limit),
                offset: offset.unwrap_or(request.offset),
            },
            // An envelope without a total is no better than a bare array
            PageBody::Envelope {
                data, total: None, ..
            } => Page::from_bare(data, request),
        }
    }
}
