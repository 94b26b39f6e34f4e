use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Falls back to 0 on a clock set before 1970.
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

/// A clean "foreground app changed" observation produced by the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundAppEvent {
    pub app_id: String,
    pub observed_at_ms: i64,
}

/// What the watcher hands its subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForegroundSignal {
    /// A tracked (non-home, non-self) app came to the foreground.
    Changed(ForegroundAppEvent),
    /// The foreground moved from a tracked app to the launcher or the host app.
    Departed { observed_at_ms: i64 },
}
