//! Shared test utilities: a temporary rule database and recording fakes
//! for every host-UI and platform seam.

#![cfg(test)]

use crate::db::{migrations, Database};
use crate::models::OverlayKind;
use crate::overlay::{
    NavigationTarget, Navigator, Notice, Notifier, NotifyError, RenderError, RenderedSurface, SurfaceActions,
    SurfaceRenderer, SurfaceSpec,
};
use crate::service::{PlatformError, ServicePlatform, StatusIndicator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

/// Poll `condition` until it holds, failing the test after two seconds.
pub fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 2s");
        thread::sleep(Duration::from_millis(5));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCall {
    Created(OverlayKind),
    Released(OverlayKind),
}

#[derive(Default)]
struct RenderLog {
    calls: Vec<RenderCall>,
    live: usize,
    max_live: usize,
    last_actions: Option<SurfaceActions>,
    fail_next: Option<RenderError>,
}

/// Records every surface creation and release and tracks how many are live.
pub struct RecordingRenderer {
    can_draw: AtomicBool,
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            can_draw: AtomicBool::new(true),
            log: Arc::new(Mutex::new(RenderLog::default())),
        }
    }

    pub fn set_can_draw(&self, allowed: bool) {
        self.can_draw.store(allowed, Ordering::SeqCst);
    }

    pub fn fail_next(&self, error: RenderError) {
        self.log.lock().unwrap().fail_next = Some(error);
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, RenderCall::Created(_))).count()
    }

    pub fn live_count(&self) -> usize {
        self.log.lock().unwrap().live
    }

    pub fn max_live(&self) -> usize {
        self.log.lock().unwrap().max_live
    }

    pub fn last_actions(&self) -> Option<SurfaceActions> {
        self.log.lock().unwrap().last_actions.clone()
    }
}

impl SurfaceRenderer for RecordingRenderer {
    fn can_draw_overlays(&self) -> bool {
        self.can_draw.load(Ordering::SeqCst)
    }

    fn render_surface(
        &self,
        spec: &SurfaceSpec,
        actions: SurfaceActions,
    ) -> Result<Box<dyn RenderedSurface>, RenderError> {
        let mut log = self.log.lock().unwrap();
        if let Some(error) = log.fail_next.take() {
            return Err(error);
        }
        log.calls.push(RenderCall::Created(spec.kind));
        log.live += 1;
        log.max_live = log.max_live.max(log.live);
        log.last_actions = Some(actions);
        Ok(Box::new(RecordedSurface {
            kind: spec.kind,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordedSurface {
    kind: OverlayKind,
    log: Arc<Mutex<RenderLog>>,
}

impl RenderedSurface for RecordedSurface {
    fn release(self: Box<Self>) {
        let mut log = self.log.lock().unwrap();
        log.calls.push(RenderCall::Released(self.kind));
        log.live -= 1;
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    targets: Mutex<Vec<NavigationTarget>>,
}

impl RecordingNavigator {
    pub fn targets(&self) -> Vec<NavigationTarget> {
        self.targets.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &NavigationTarget) {
        self.targets.lock().unwrap().push(target.clone());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn post(&self, notice: &Notice) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError("channel disabled".into()));
        }
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCall {
    AcquireGrant,
    PublishIndicator,
    WithdrawIndicator,
    ReleaseGrant,
}

#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    sticky: bool,
    deny_grant: bool,
    fail_indicator: bool,
}

impl RecordingPlatform {
    pub fn sticky() -> Self {
        Self {
            sticky: true,
            ..Self::default()
        }
    }

    pub fn denying_grant() -> Self {
        Self {
            deny_grant: true,
            ..Self::default()
        }
    }

    pub fn failing_indicator() -> Self {
        Self {
            fail_indicator: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ServicePlatform for RecordingPlatform {
    fn acquire_foreground_grant(&self) -> Result<(), PlatformError> {
        self.record(PlatformCall::AcquireGrant);
        if self.deny_grant {
            return Err(PlatformError::GrantDenied("not allowed in test".into()));
        }
        Ok(())
    }

    fn publish_status_indicator(&self, indicator: &StatusIndicator) -> Result<(), PlatformError> {
        self.record(PlatformCall::PublishIndicator);
        if self.fail_indicator {
            return Err(PlatformError::Indicator(format!("'{}' rejected in test", indicator.title)));
        }
        Ok(())
    }

    fn withdraw_status_indicator(&self) {
        self.record(PlatformCall::WithdrawIndicator);
    }

    fn release_foreground_grant(&self) {
        self.record(PlatformCall::ReleaseGrant);
    }

    fn supports_sticky_restart(&self) -> bool {
        self.sticky
    }
}
