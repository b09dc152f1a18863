//! Transient status banners
//!
//! Success banners dismiss themselves after a fixed delay. Error banners stay
//! until the user dismisses them.

use std::time::{Duration, Instant};

/// How long a success banner stays on screen
pub const SUCCESS_BANNER_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// A message shown above the current screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    shown_at: Instant,
    ttl: Option<Duration>,
}

impl Banner {
    /// Success banner that expires after [`SUCCESS_BANNER_TTL`]
    pub fn success(message: impl Into<String>, now: Instant) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            shown_at: now,
            ttl: Some(SUCCESS_BANNER_TTL),
        }
    }

    /// Error banner that stays until dismissed
    pub fn error(message: impl Into<String>, now: Instant) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            shown_at: now,
            ttl: None,
        }
    }

    /// Whether the banner should be gone at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(self.shown_at) >= ttl,
            None => false,
        }
    }
}
