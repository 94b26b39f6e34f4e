use super::{ForegroundSource, RawFocusEvent, SourceError, WatchStrategy};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Source fed through a channel: scripted replays and tests.
pub struct ChannelSource {
    events: Receiver<RawFocusEvent>,
    home_app_id: Option<String>,
}

impl ChannelSource {
    pub fn new(home_app_id: Option<String>) -> (Sender<RawFocusEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self { events: rx, home_app_id })
    }
}

impl ForegroundSource for ChannelSource {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Scripted
    }

    fn resolve_home_app_id(&mut self) -> Option<String> {
        self.home_app_id.clone()
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Exhausted),
        }
    }
}

/// Stands in when the platform offers no way to observe the foreground.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl ForegroundSource for UnavailableSource {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Inert
    }

    fn next_event(&mut self, _timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError> {
        Err(SourceError::Unavailable(self.reason.clone()))
    }
}
