use crate::constants::{DEFAULT_REMINDER_MESSAGE, REMINDER_TIMEOUT_MS};
use crate::error::GuardError;
use crate::models::DistractingAppRule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// The three overlay variants the surface manager can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Dismissible,
    AnimatedLoop,
    ForcedBlock,
}

impl OverlayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OverlayKind::Dismissible => "dismissible",
            OverlayKind::AnimatedLoop => "animated_loop",
            OverlayKind::ForcedBlock => "forced_block",
        }
    }

    /// Accepts the canonical names plus the legacy `type1`..`type3` wire names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dismissible" | "self_declaration" | "type1" => Some(OverlayKind::Dismissible),
            "animated_loop" | "gif_loop" | "type2" => Some(OverlayKind::AnimatedLoop),
            "forced_block" | "forcedblock" | "type3" => Some(OverlayKind::ForcedBlock),
            _ => None,
        }
    }

    /// Forced blocks stay until the user navigates away.
    pub fn may_self_cancel(self) -> bool {
        !matches!(self, OverlayKind::ForcedBlock)
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    LocalDetection,
    RemoteCommand,
    ManualTest,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerSource::LocalDetection => "local_detection",
            TriggerSource::RemoteCommand => "remote_command",
            TriggerSource::ManualTest => "manual_test",
        };
        f.write_str(name)
    }
}

/// Media shown inside an overlay: a remote animation or a bundled asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    Remote(Url),
    Asset(String),
}

impl MediaRef {
    pub fn parse(raw: &str) -> Result<Self, GuardError> {
        let raw = raw.trim();
        let invalid = |reason: &str| GuardError::InvalidInput {
            field: "media_ref",
            reason: reason.into(),
        };

        if raw.is_empty() {
            return Err(invalid("cannot be empty"));
        }

        if raw.contains("://") {
            let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
            return match url.scheme() {
                "http" | "https" => Ok(MediaRef::Remote(url)),
                other => Err(invalid(&format!("unsupported scheme '{other}'"))),
            };
        }

        if raw.starts_with('/') || raw.starts_with('\\') {
            return Err(invalid("asset path must be relative"));
        }
        if raw.split(['/', '\\']).any(|part| part == "..") {
            return Err(invalid("asset path cannot leave the asset directory"));
        }

        Ok(MediaRef::Asset(raw.to_string()))
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaRef::Remote(url) => write!(f, "{url}"),
            MediaRef::Asset(path) => write!(f, "asset:{path}"),
        }
    }
}

/// Everything needed to render one overlay. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRequest {
    kind: OverlayKind,
    message: String,
    media_ref: Option<MediaRef>,
    source: TriggerSource,
    auto_hide: Option<Duration>,
}

impl OverlayRequest {
    pub fn new(
        kind: OverlayKind,
        message: impl Into<String>,
        media_ref: Option<MediaRef>,
        source: TriggerSource,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            media_ref,
            source,
            auto_hide: None,
        }
    }

    /// Overrides the configured auto-hide for this request. Ignored for forced blocks.
    #[must_use]
    pub fn with_auto_hide(mut self, after: Duration) -> Self {
        self.auto_hide = Some(after);
        self
    }

    /// The reminder shown when a distracting app is detected locally.
    pub fn distraction_alert(rule: &DistractingAppRule, kind: OverlayKind) -> Self {
        Self::new(
            kind,
            format!("You're using {}. Time to get back to focus!", rule.display_name),
            None,
            TriggerSource::LocalDetection,
        )
    }

    pub fn break_reminder() -> Self {
        Self::new(
            OverlayKind::Dismissible,
            "Work session finished! Take a short break.",
            None,
            TriggerSource::ManualTest,
        )
        .with_auto_hide(Duration::from_millis(REMINDER_TIMEOUT_MS))
    }

    pub fn focus_reminder() -> Self {
        Self::new(
            OverlayKind::Dismissible,
            "Break is over! Back to work.",
            None,
            TriggerSource::ManualTest,
        )
        .with_auto_hide(Duration::from_millis(REMINDER_TIMEOUT_MS))
    }

    pub fn kind(&self) -> OverlayKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn media_ref(&self) -> Option<&MediaRef> {
        self.media_ref.as_ref()
    }

    pub fn source(&self) -> TriggerSource {
        self.source
    }

    pub fn auto_hide(&self) -> Option<Duration> {
        self.auto_hide
    }
}

impl Default for OverlayRequest {
    fn default() -> Self {
        Self::new(
            OverlayKind::Dismissible,
            DEFAULT_REMINDER_MESSAGE,
            None,
            TriggerSource::ManualTest,
        )
    }
}

/// Descriptor of the single live overlay. The surface itself stays inside the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySurfaceHandle {
    pub id: u64,
    pub kind: OverlayKind,
    pub source: TriggerSource,
    pub shown_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppCategory;

    #[test]
    fn test_kind_parse_accepts_legacy_names() {
        assert_eq!(OverlayKind::parse("type1"), Some(OverlayKind::Dismissible));
        assert_eq!(OverlayKind::parse("TYPE2"), Some(OverlayKind::AnimatedLoop));
        assert_eq!(OverlayKind::parse("type3"), Some(OverlayKind::ForcedBlock));
        assert_eq!(OverlayKind::parse(" forced_block "), Some(OverlayKind::ForcedBlock));
        assert_eq!(OverlayKind::parse("popup"), None);
    }

    #[test]
    fn test_only_forced_block_refuses_self_cancel() {
        assert!(OverlayKind::Dismissible.may_self_cancel());
        assert!(OverlayKind::AnimatedLoop.may_self_cancel());
        assert!(!OverlayKind::ForcedBlock.may_self_cancel());
    }

    #[test]
    fn test_media_ref_remote_url() {
        let media = MediaRef::parse("https://cdn.example.com/mochi.gif").unwrap();
        assert!(matches!(media, MediaRef::Remote(ref u) if u.host_str() == Some("cdn.example.com")));
    }

    #[test]
    fn test_media_ref_asset_path() {
        assert_eq!(
            MediaRef::parse("mochi/mochi_angry.png").unwrap(),
            MediaRef::Asset("mochi/mochi_angry.png".into())
        );
    }

    #[test]
    fn test_media_ref_rejects_unsafe_values() {
        assert!(MediaRef::parse("").is_err());
        assert!(MediaRef::parse("/etc/passwd").is_err());
        assert!(MediaRef::parse("mochi/../../secret").is_err());
        assert!(MediaRef::parse("file:///tmp/x.gif").is_err());
        assert!(MediaRef::parse("https://").is_err());
    }

    #[test]
    fn test_distraction_alert_names_the_app() {
        let rule = DistractingAppRule::new("com.instagram.android", "Instagram", AppCategory::Social);
        let request = OverlayRequest::distraction_alert(&rule, OverlayKind::Dismissible);
        assert_eq!(request.source(), TriggerSource::LocalDetection);
        assert!(request.message().contains("Instagram"));
        assert!(request.auto_hide().is_none());
    }

    #[test]
    fn test_reminder_presets_auto_hide() {
        let request = OverlayRequest::break_reminder();
        assert_eq!(request.kind(), OverlayKind::Dismissible);
        assert_eq!(request.auto_hide(), Some(Duration::from_millis(REMINDER_TIMEOUT_MS)));
        assert!(OverlayRequest::focus_reminder().auto_hide().is_some());
    }
}
