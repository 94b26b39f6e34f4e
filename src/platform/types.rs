use crate::models::current_timestamp_ms;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One raw focus transition as reported by the OS, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFocusEvent {
    pub app_id: String,
    pub observed_at_ms: i64,
}

impl RawFocusEvent {
    pub fn new(app_id: impl Into<String>, observed_at_ms: i64) -> Self {
        Self { app_id: app_id.into(), observed_at_ms }
    }

    /// Stamped with the current wall clock.
    pub fn observed_now(app_id: impl Into<String>) -> Self {
        Self::new(app_id, current_timestamp_ms())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategy {
    Push,
    Poll,
    Scripted,
    Inert,
}

impl fmt::Display for WatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WatchStrategy::Push => "push",
            WatchStrategy::Poll => "poll",
            WatchStrategy::Scripted => "scripted",
            WatchStrategy::Inert => "inert",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Permission missing or no display to observe; the watcher goes inert.
    #[error("foreground source unavailable: {0}")]
    Unavailable(String),

    /// A single query failed; retried on the next tick.
    #[error("transient foreground source failure: {0}")]
    Transient(String),

    /// A finite source (scripted input) has nothing more to report.
    #[error("foreground source exhausted")]
    Exhausted,
}

/// A stream of raw focus transitions. Implementations block for at most
/// `timeout` and return `Ok(None)` when nothing happened in that window.
pub trait ForegroundSource: Send {
    fn strategy(&self) -> WatchStrategy;

    /// The device launcher, when the platform can name one.
    fn resolve_home_app_id(&mut self) -> Option<String> {
        None
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError>;
}

/// "Which app is frontmost right now", the primitive behind the poll strategy.
pub trait FrontmostQuery: Send {
    fn frontmost_app_id(&self) -> Result<Option<String>, SourceError>;

    fn home_app_id(&self) -> Option<String> {
        None
    }
}
