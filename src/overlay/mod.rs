//! Overlay Surface Manager.
//!
//! Owns the only live overlay. Every `show`/`hide`, whatever triggered it,
//! goes through one mutex around the check-and-set of the live surface, so
//! two triggers can never leave two surfaces on screen.

mod console;
mod surface;

pub use console::{ConsoleRenderer, LogNavigator, LogNotifier};
pub use surface::{
    ButtonRole, NavigationTarget, Navigator, Notice, Notifier, NotifyError, RenderError,
    RenderedSurface, SurfaceButton, SurfaceRenderer, SurfaceSpec,
};

use crate::config::GuardConfig;
use crate::constants::COOL_DOWN_ROUTE;
use crate::models::{current_timestamp_ms, OverlayKind, OverlayRequest, OverlaySurfaceHandle};
use crate::safe_lock;
use crate::status::EngineStatus;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Why a `show` did not put a new surface on screen.
#[derive(Debug, Error)]
pub enum ShowRejected {
    /// A surface of the same kind is already live; nothing changed.
    #[error("a {} overlay is already showing", .0.kind)]
    AlreadyShowing(OverlaySurfaceHandle),

    /// Drawing overlays is not permitted; a fallback notification was posted.
    #[error("overlay permission missing")]
    Inert,

    #[error(transparent)]
    RenderFailed(#[from] RenderError),
}

/// Self-cancel delays per kind. Forced blocks never self-cancel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlaySettings {
    pub dismissible_timeout: Option<Duration>,
    pub animated_loop_timeout: Option<Duration>,
}

impl OverlaySettings {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            dismissible_timeout: config.auto_hide_for(OverlayKind::Dismissible),
            animated_loop_timeout: config.auto_hide_for(OverlayKind::AnimatedLoop),
        }
    }

    fn auto_hide_for(&self, request: &OverlayRequest) -> Option<Duration> {
        if !request.kind().may_self_cancel() {
            return None;
        }
        let configured = match request.kind() {
            OverlayKind::Dismissible => self.dismissible_timeout,
            OverlayKind::AnimatedLoop => self.animated_loop_timeout,
            OverlayKind::ForcedBlock => None,
        };
        request.auto_hide().or(configured)
    }
}

/// Handed to the renderer with each surface. Presses are bound to that
/// surface's generation, so a late press on a replaced surface is ignored.
#[derive(Clone)]
pub struct SurfaceActions {
    generation: u64,
    manager: Weak<ManagerInner>,
}

impl SurfaceActions {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn press(&self, role: ButtonRole) {
        match self.manager.upgrade() {
            Some(inner) => inner.handle_press(self.generation, role),
            None => debug!("Overlay manager gone, ignoring {role} press"),
        }
    }

    pub fn dismiss(&self) {
        self.press(ButtonRole::Dismiss);
    }

    pub fn primary(&self) {
        self.press(ButtonRole::Primary);
    }

    pub fn secondary(&self) {
        self.press(ButtonRole::Secondary);
    }
}

struct LiveSurface {
    handle: OverlaySurfaceHandle,
    spec: SurfaceSpec,
    surface: Box<dyn RenderedSurface>,
}

#[derive(Default)]
struct SurfaceSlot {
    live: Option<LiveSurface>,
    /// Kinds that already got a fallback notification since the last hide.
    fallback_posted: HashSet<OverlayKind>,
}

struct ManagerInner {
    renderer: Arc<dyn SurfaceRenderer>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    status: Arc<EngineStatus>,
    settings: OverlaySettings,
    slot: Mutex<SurfaceSlot>,
    next_generation: AtomicU64,
}

#[derive(Clone)]
pub struct OverlaySurfaceManager {
    inner: Arc<ManagerInner>,
}

impl OverlaySurfaceManager {
    pub fn new(
        renderer: Arc<dyn SurfaceRenderer>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        status: Arc<EngineStatus>,
        settings: OverlaySettings,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                renderer,
                navigator,
                notifier,
                status,
                settings,
                slot: Mutex::new(SurfaceSlot::default()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Show `request`, replacing a live surface of a different kind.
    pub fn show(&self, request: &OverlayRequest) -> Result<OverlaySurfaceHandle, ShowRejected> {
        let handle = self.inner.show(request)?;
        if let Some(after) = self.inner.settings.auto_hide_for(request) {
            self.schedule_auto_hide(handle.id, after);
        }
        Ok(handle)
    }

    /// Tear down the live surface, if any. Never fails.
    pub fn hide(&self) {
        self.inner.hide();
    }

    /// Hide only if `generation` is still the live surface.
    pub fn hide_generation(&self, generation: u64) -> bool {
        self.inner.take_generation(generation).is_some()
    }

    pub fn current(&self) -> Option<OverlaySurfaceHandle> {
        safe_lock(&self.inner.slot, "Overlay slot").live.as_ref().map(|live| live.handle)
    }

    fn schedule_auto_hide(&self, generation: u64, after: Duration) {
        let manager = Arc::downgrade(&self.inner);
        debug!("Overlay {generation} auto-hides in {}ms", after.as_millis());
        thread::spawn(move || {
            thread::sleep(after);
            if let Some(inner) = manager.upgrade() {
                if inner.take_generation(generation).is_some() {
                    info!("Overlay {generation} auto-hidden");
                }
            }
        });
    }
}

impl ManagerInner {
    fn show(self: &Arc<Self>, request: &OverlayRequest) -> Result<OverlaySurfaceHandle, ShowRejected> {
        let mut slot = safe_lock(&self.slot, "Overlay slot");

        if let Some(live) = &slot.live {
            if live.handle.kind == request.kind() {
                debug!("{} overlay already showing, ignoring {} request", live.handle.kind, request.source());
                return Err(ShowRejected::AlreadyShowing(live.handle));
            }
        }

        if !self.renderer.can_draw_overlays() {
            self.status.flag_overlay_permission_missing();
            self.post_fallback(&mut slot, request);
            return Err(ShowRejected::Inert);
        }

        if let Some(previous) = slot.live.take() {
            info!(
                "Replacing {} overlay {} with {}",
                previous.handle.kind,
                previous.handle.id,
                request.kind()
            );
            previous.surface.release();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let spec = SurfaceSpec::for_request(request);
        let actions = SurfaceActions {
            generation,
            manager: Arc::downgrade(self),
        };

        match self.renderer.render_surface(&spec, actions) {
            Ok(surface) => {
                let handle = OverlaySurfaceHandle {
                    id: generation,
                    kind: request.kind(),
                    source: request.source(),
                    shown_at_ms: current_timestamp_ms(),
                };
                info!("Showing {} overlay {generation} ({})", handle.kind, handle.source);
                self.status.clear_overlay_permission_missing();
                slot.live = Some(LiveSurface { handle, spec, surface });
                Ok(handle)
            }
            Err(e) => {
                if matches!(e, RenderError::PermissionRevoked) {
                    self.status.flag_overlay_permission_missing();
                }
                warn!("Failed to render {} overlay: {e}", request.kind());
                self.post_fallback(&mut slot, request);
                Err(ShowRejected::RenderFailed(e))
            }
        }
    }

    fn post_fallback(&self, slot: &mut SurfaceSlot, request: &OverlayRequest) {
        if !slot.fallback_posted.insert(request.kind()) {
            debug!("Fallback for {} already posted", request.kind());
            return;
        }
        info!("Posting fallback notification for {} overlay", request.kind());
        if let Err(e) = self.notifier.post(&Notice::fallback_for(request)) {
            warn!("Fallback notification failed: {e}");
        }
    }

    fn hide(&self) {
        let mut slot = safe_lock(&self.slot, "Overlay slot");
        slot.fallback_posted.clear();
        match slot.live.take() {
            Some(live) => {
                info!("Hiding {} overlay {}", live.handle.kind, live.handle.id);
                live.surface.release();
            }
            None => debug!("Hide requested with no live overlay"),
        }
    }

    fn take_generation(&self, generation: u64) -> Option<OverlaySurfaceHandle> {
        let mut slot = safe_lock(&self.slot, "Overlay slot");
        if slot.live.as_ref().map(|live| live.handle.id) != Some(generation) {
            return None;
        }
        slot.fallback_posted.clear();
        let live = slot.live.take()?;
        live.surface.release();
        Some(live.handle)
    }

    fn handle_press(&self, generation: u64, role: ButtonRole) {
        {
            let slot = safe_lock(&self.slot, "Overlay slot");
            let Some(live) = slot.live.as_ref().filter(|live| live.handle.id == generation) else {
                debug!("Ignoring {role} press from stale overlay {generation}");
                return;
            };
            if !live.spec.has_button(role) {
                warn!("{} overlay has no {role} button", live.handle.kind);
                return;
            }
        }

        let Some(handle) = self.take_generation(generation) else {
            return;
        };
        info!("{} overlay {generation} closed by {role} button", handle.kind);

        let target = match role {
            ButtonRole::Dismiss => None,
            ButtonRole::Primary => Some(NavigationTarget::Home),
            ButtonRole::Secondary => Some(NavigationTarget::HostApp {
                route: COOL_DOWN_ROUTE.to_string(),
            }),
        };
        if let Some(target) = target {
            self.navigator.navigate(&target);
        }
    }
}
