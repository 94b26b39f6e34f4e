// src/constants.rs

/// Same-app focus events closer than this are treated as one (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Upper bound accepted for a configured debounce window (milliseconds)
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Default interval for the poll strategy (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Accepted poll interval range (milliseconds)
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Visits to the same distracting app before the reminder becomes a forced block
pub const DEFAULT_ESCALATE_AFTER_VISITS: u32 = 3;

/// Auto-hide for the animated loop overlay (milliseconds)
pub const DEFAULT_ANIMATED_LOOP_TIMEOUT_MS: u64 = 15_000;

/// Accepted range for a configured auto-hide delay (milliseconds)
pub const MIN_AUTO_HIDE_MS: u64 = 1_000;
pub const MAX_AUTO_HIDE_MS: u64 = 3_600_000;

/// Auto-hide used by the break/focus reminder presets (milliseconds)
pub const REMINDER_TIMEOUT_MS: u64 = 10_000;

/// Identifier of the host app; never treated as distracting
pub const DEFAULT_SELF_APP_ID: &str = "com.taichi_mochi";

/// Message used when a remote command carries none
pub const DEFAULT_REMINDER_MESSAGE: &str = "Focus time! Put the phone down and get back to it.";

/// In-app route opened by the forced block's secondary button
pub const COOL_DOWN_ROUTE: &str = "cool_down";

/// How long the watcher thread blocks on its source before re-checking the stop flag
pub const WATCHER_TICK_MS: u64 = 100;

/// Maximum app identifier length
pub const MAX_APP_ID_LEN: usize = 255;

/// Maximum display name length
pub const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Maximum overlay message length
pub const MAX_MESSAGE_LEN: usize = 500;
