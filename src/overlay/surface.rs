//! The seam between the surface manager and whatever draws pixels.

use super::SurfaceActions;
use crate::models::{MediaRef, OverlayKind, OverlayRequest};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonRole {
    Dismiss,
    Primary,
    Secondary,
}

impl fmt::Display for ButtonRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonRole::Dismiss => "dismiss",
            ButtonRole::Primary => "primary",
            ButtonRole::Secondary => "secondary",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceButton {
    pub role: ButtonRole,
    pub label: &'static str,
    /// Drawn small and out of the way.
    pub compact: bool,
}

/// Everything a renderer needs to draw one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub kind: OverlayKind,
    pub message: String,
    pub media_ref: Option<MediaRef>,
    pub buttons: Vec<SurfaceButton>,
    /// Whether the surface swallows touches meant for the app below.
    pub blocks_input: bool,
    /// Always false: swallowing the system back button can lock the user out.
    pub intercepts_back: bool,
}

impl SurfaceSpec {
    pub fn buttons_for(kind: OverlayKind) -> Vec<SurfaceButton> {
        match kind {
            OverlayKind::Dismissible => vec![SurfaceButton {
                role: ButtonRole::Dismiss,
                label: "Back to mochi",
                compact: false,
            }],
            OverlayKind::AnimatedLoop => vec![SurfaceButton {
                role: ButtonRole::Dismiss,
                label: "Don't tap this",
                compact: true,
            }],
            OverlayKind::ForcedBlock => vec![
                SurfaceButton {
                    role: ButtonRole::Primary,
                    label: "end, home",
                    compact: false,
                },
                SurfaceButton {
                    role: ButtonRole::Secondary,
                    label: "go cool down",
                    compact: false,
                },
            ],
        }
    }

    pub fn for_request(request: &OverlayRequest) -> Self {
        let kind = request.kind();
        Self {
            kind,
            message: request.message().to_string(),
            media_ref: request.media_ref().cloned(),
            buttons: Self::buttons_for(kind),
            blocks_input: !matches!(kind, OverlayKind::AnimatedLoop),
            intercepts_back: false,
        }
    }

    pub fn has_button(&self, role: ButtonRole) -> bool {
        self.buttons.iter().any(|button| button.role == role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationTarget {
    /// The device home screen.
    Home,
    /// Back into the host app at an in-app route.
    HostApp { route: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("overlay permission revoked")]
    PermissionRevoked,

    #[error("surface creation failed: {0}")]
    Platform(String),
}

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Draws overlay surfaces above every other window.
///
/// `render_surface` runs while the manager holds its lock, so it must not
/// invoke `actions` synchronously; button presses arrive later from the UI.
pub trait SurfaceRenderer: Send + Sync {
    fn can_draw_overlays(&self) -> bool;

    fn render_surface(
        &self,
        spec: &SurfaceSpec,
        actions: SurfaceActions,
    ) -> Result<Box<dyn RenderedSurface>, RenderError>;
}

/// A drawn surface. Releasing it removes the always-on-top window.
pub trait RenderedSurface: Send {
    fn release(self: Box<Self>);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, target: &NavigationTarget);
}

/// A plain notification used when no overlay can be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn fallback_for(request: &OverlayRequest) -> Self {
        Self {
            title: "Time to focus".to_string(),
            body: request.message().to_string(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn post(&self, notice: &Notice) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriggerSource;

    #[test]
    fn test_forced_block_has_two_navigating_buttons() {
        let request = OverlayRequest::new(OverlayKind::ForcedBlock, "stop", None, TriggerSource::RemoteCommand);
        let spec = SurfaceSpec::for_request(&request);
        assert!(spec.has_button(ButtonRole::Primary));
        assert!(spec.has_button(ButtonRole::Secondary));
        assert!(!spec.has_button(ButtonRole::Dismiss));
        assert!(spec.blocks_input);
        assert!(!spec.intercepts_back);
    }

    #[test]
    fn test_single_dismiss_button_for_soft_kinds() {
        for kind in [OverlayKind::Dismissible, OverlayKind::AnimatedLoop] {
            let buttons = SurfaceSpec::buttons_for(kind);
            assert_eq!(buttons.len(), 1);
            assert_eq!(buttons.first().map(|b| b.role), Some(ButtonRole::Dismiss));
        }
        assert!(SurfaceSpec::buttons_for(OverlayKind::AnimatedLoop).iter().all(|b| b.compact));
    }

    #[test]
    fn test_animated_loop_does_not_block_input() {
        let request = OverlayRequest::new(OverlayKind::AnimatedLoop, "hey", None, TriggerSource::ManualTest);
        assert!(!SurfaceSpec::for_request(&request).blocks_input);
    }
}
