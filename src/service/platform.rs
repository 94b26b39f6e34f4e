use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

/// The persistent notification shown while the service runs. Platforms post
/// it at their lowest priority: no sound, no heads-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusIndicator {
    pub title: String,
    pub body: String,
    /// Cannot be swiped away.
    pub ongoing: bool,
}

impl StatusIndicator {
    pub fn engine_active() -> Self {
        Self {
            title: "Mochi Guard".to_string(),
            body: "Watching your focus".to_string(),
            ongoing: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("foreground execution grant denied: {0}")]
    GrantDenied(String),

    #[error("status indicator could not be published: {0}")]
    Indicator(String),
}

/// What the OS must provide for the engine to keep running in the background.
pub trait ServicePlatform: Send + Sync {
    fn acquire_foreground_grant(&self) -> Result<(), PlatformError>;

    fn publish_status_indicator(&self, indicator: &StatusIndicator) -> Result<(), PlatformError>;

    fn withdraw_status_indicator(&self);

    fn release_foreground_grant(&self);

    /// Whether the OS restarts a killed service on its own.
    fn supports_sticky_restart(&self) -> bool;
}

/// For desktop and CLI use: nothing to acquire, the indicator is a log line.
/// There is no supervisor, so a killed engine stays down.
#[derive(Debug, Default)]
pub struct HeadlessPlatform;

impl ServicePlatform for HeadlessPlatform {
    fn acquire_foreground_grant(&self) -> Result<(), PlatformError> {
        Ok(())
    }

    fn publish_status_indicator(&self, indicator: &StatusIndicator) -> Result<(), PlatformError> {
        info!("{}: {}", indicator.title, indicator.body);
        Ok(())
    }

    fn withdraw_status_indicator(&self) {
        info!("Status indicator withdrawn");
    }

    fn release_foreground_grant(&self) {}

    fn supports_sticky_restart(&self) -> bool {
        warn!("Headless platform has no restart supervisor");
        false
    }
}
