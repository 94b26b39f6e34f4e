pub mod events;
pub mod overlay;
pub mod rule;

pub use events::{current_timestamp_ms, ForegroundAppEvent, ForegroundSignal};
pub use overlay::{MediaRef, OverlayKind, OverlayRequest, OverlaySurfaceHandle, TriggerSource};
pub use rule::{default_rules, AppCategory, DistractingAppRule, DEFAULT_RULES};
