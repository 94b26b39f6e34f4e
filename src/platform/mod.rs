//! Foreground observation, one source per OS.
//!
//! Every source implements [`ForegroundSource`]; the watcher never knows
//! whether it is being pushed to or is polling.

mod channel;
mod poll;
pub mod types;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

pub use channel::{ChannelSource, UnavailableSource};
pub use poll::PollingSource;
pub use types::{ForegroundSource, FrontmostQuery, RawFocusEvent, SourceError, WatchStrategy};

use crate::config::WatchStrategyPreference;
use std::time::Duration;

/// Open the best native source for `preference`. Never fails: when the
/// platform cannot observe the foreground, the returned source reports
/// [`SourceError::Unavailable`] and the watcher goes inert.
#[cfg(target_os = "linux")]
pub fn open_native_source(
    preference: WatchStrategyPreference,
    poll_interval: Duration,
) -> Box<dyn ForegroundSource> {
    use linux::{X11Display, X11PushSource};
    use log::{info, warn};

    if matches!(preference, WatchStrategyPreference::Auto | WatchStrategyPreference::Push) {
        match X11PushSource::connect() {
            Ok(source) => return Box::new(source),
            Err(e) if preference == WatchStrategyPreference::Push => {
                warn!("Push foreground source failed: {e}");
                return Box::new(UnavailableSource::new(e.to_string()));
            }
            Err(e) => info!("Push foreground source failed ({e}), falling back to polling"),
        }
    }

    match X11Display::connect() {
        Ok(display) => Box::new(PollingSource::new(display, poll_interval)),
        Err(e) => {
            warn!("Poll foreground source failed: {e}");
            Box::new(UnavailableSource::new(e.to_string()))
        }
    }
}

#[cfg(target_os = "macos")]
pub fn open_native_source(
    preference: WatchStrategyPreference,
    poll_interval: Duration,
) -> Box<dyn ForegroundSource> {
    if preference == WatchStrategyPreference::Push {
        log::info!("Push foreground source not available on macOS, polling instead");
    }
    Box::new(PollingSource::new(macos::WorkspaceQuery, poll_interval))
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn open_native_source(
    _preference: WatchStrategyPreference,
    _poll_interval: Duration,
) -> Box<dyn ForegroundSource> {
    Box::new(UnavailableSource::new("foreground observation is not supported on this platform"))
}
