//! Background Service Host.
//!
//! Owns the engine for one process: the watcher, the coordinator's dispatch
//! thread and the remote receiver subscription all live and die with the
//! `Running` state.
//!
//! ```text
//! Stopped --start--> Starting --indicator published--> Running
//! Running --stop--> Stopping --teardown--> Stopped
//! Running --killed--> Stopped (--sticky restart--> Starting)
//! ```

mod platform;

pub use platform::{HeadlessPlatform, PlatformError, ServicePlatform, StatusIndicator};

use crate::classifier::Classifier;
use crate::config::{GuardConfig, RestartPolicy};
use crate::coordinator::{policy_from_config, EscalationPolicy, InterventionCoordinator, Trigger};
use crate::error::GuardError;
use crate::models::{current_timestamp_ms, OverlayRequest};
use crate::overlay::{Navigator, Notifier, OverlaySettings, OverlaySurfaceManager, SurfaceRenderer};
use crate::platform::ForegroundSource;
use crate::remote::RemoteCommandReceiver;
use crate::safe_lock;
use crate::status::EngineStatus;
use crate::watcher::{ForegroundWatcher, WatcherSettings};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Stopped => "stopped",
            ServiceState::Starting => "starting",
            ServiceState::Running => "running",
            ServiceState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceRunState {
    pub state: ServiceState,
    pub running: bool,
    pub started_at_ms: Option<i64>,
}

/// The parts the host keeps alive. Built once per process.
pub struct ServiceComponents {
    pub watcher: ForegroundWatcher,
    pub classifier: Arc<Classifier>,
    pub overlay: OverlaySurfaceManager,
    pub receiver: Arc<RemoteCommandReceiver>,
    pub status: Arc<EngineStatus>,
}

impl ServiceComponents {
    pub fn assemble(
        config: &GuardConfig,
        source: Box<dyn ForegroundSource>,
        classifier: Arc<Classifier>,
        renderer: Arc<dyn SurfaceRenderer>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let status = Arc::new(EngineStatus::new());
        let overlay = OverlaySurfaceManager::new(
            renderer,
            navigator,
            notifier,
            Arc::clone(&status),
            OverlaySettings::from_config(config),
        );
        let watcher = ForegroundWatcher::new(source, WatcherSettings::from_config(config), Arc::clone(&status));
        Self {
            watcher,
            classifier,
            overlay,
            receiver: Arc::new(RemoteCommandReceiver::new()),
            status,
        }
    }
}

type PolicyFactory = Box<dyn Fn() -> Box<dyn EscalationPolicy> + Send + Sync>;

struct Dispatch {
    sender: Sender<Trigger>,
    worker: JoinHandle<()>,
}

struct Lifecycle {
    state: ServiceState,
    started_at_ms: Option<i64>,
    dispatch: Option<Dispatch>,
}

pub struct BackgroundServiceHost {
    platform: Arc<dyn ServicePlatform>,
    components: ServiceComponents,
    restart_policy: RestartPolicy,
    policy_factory: PolicyFactory,
    lifecycle: Mutex<Lifecycle>,
}

impl BackgroundServiceHost {
    pub fn new(components: ServiceComponents, platform: Arc<dyn ServicePlatform>, config: &GuardConfig) -> Self {
        let escalation = config.clone();
        Self {
            platform,
            components,
            restart_policy: config.restart_policy,
            policy_factory: Box::new(move || policy_from_config(&escalation)),
            lifecycle: Mutex::new(Lifecycle {
                state: ServiceState::Stopped,
                started_at_ms: None,
                dispatch: None,
            }),
        }
    }

    /// Replace how each session's escalation policy is built.
    #[must_use]
    pub fn with_escalation_policy<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn EscalationPolicy> + Send + Sync + 'static,
    {
        self.policy_factory = Box::new(factory);
        self
    }

    pub fn overlay(&self) -> &OverlaySurfaceManager {
        &self.components.overlay
    }

    pub fn receiver(&self) -> Arc<RemoteCommandReceiver> {
        Arc::clone(&self.components.receiver)
    }

    pub fn status(&self) -> Arc<EngineStatus> {
        Arc::clone(&self.components.status)
    }

    pub fn watcher(&self) -> &ForegroundWatcher {
        &self.components.watcher
    }

    pub fn classifier(&self) -> Arc<Classifier> {
        Arc::clone(&self.components.classifier)
    }

    pub fn run_state(&self) -> ServiceRunState {
        let lifecycle = safe_lock(&self.lifecycle, "Service lifecycle");
        ServiceRunState {
            state: lifecycle.state,
            running: lifecycle.state == ServiceState::Running,
            started_at_ms: lifecycle.started_at_ms,
        }
    }

    fn transition(lifecycle: &mut Lifecycle, to: ServiceState) {
        info!("Service {} -> {to}", lifecycle.state);
        lifecycle.state = to;
    }

    /// Start the engine. A no-op while already running.
    pub fn start(&self) -> Result<(), GuardError> {
        let mut lifecycle = safe_lock(&self.lifecycle, "Service lifecycle");
        if lifecycle.state != ServiceState::Stopped {
            debug!("Service start ignored in state {}", lifecycle.state);
            return Ok(());
        }

        Self::transition(&mut lifecycle, ServiceState::Starting);
        if let Err(e) = self.platform.acquire_foreground_grant() {
            warn!("Service failed to start: {e}");
            Self::transition(&mut lifecycle, ServiceState::Stopped);
            return Err(GuardError::Platform(e.to_string()));
        }
        if let Err(e) = self.platform.publish_status_indicator(&StatusIndicator::engine_active()) {
            warn!("Service failed to start: {e}");
            self.platform.release_foreground_grant();
            Self::transition(&mut lifecycle, ServiceState::Stopped);
            return Err(GuardError::Platform(e.to_string()));
        }

        let (sender, triggers) = mpsc::channel();
        let coordinator = InterventionCoordinator::new(
            Arc::clone(&self.components.classifier),
            self.components.overlay.clone(),
            (self.policy_factory)(),
        );
        let worker = thread::spawn(move || coordinator.run(&triggers));

        let foreground = sender.clone();
        self.components.watcher.on_foreground_changed(move |signal| {
            if foreground.send(Trigger::Foreground(signal)).is_err() {
                debug!("Dispatcher gone, dropping foreground signal");
            }
        });
        self.components.receiver.subscribe(sender.clone());
        self.components.watcher.start();

        lifecycle.dispatch = Some(Dispatch { sender, worker });
        lifecycle.started_at_ms = Some(current_timestamp_ms());
        Self::transition(&mut lifecycle, ServiceState::Running);
        self.components.status.set_protection_active(true);
        Ok(())
    }

    /// Stop the engine, force-hiding any overlay. A no-op unless running.
    pub fn stop(&self) {
        let mut lifecycle = safe_lock(&self.lifecycle, "Service lifecycle");
        if lifecycle.state != ServiceState::Running {
            debug!("Service stop ignored in state {}", lifecycle.state);
            return;
        }
        Self::transition(&mut lifecycle, ServiceState::Stopping);
        self.teardown(&mut lifecycle);
        Self::transition(&mut lifecycle, ServiceState::Stopped);
    }

    /// The OS killed the service. Tear down, then restart if both the
    /// configuration and the platform allow it.
    pub fn notify_killed(&self) {
        {
            let mut lifecycle = safe_lock(&self.lifecycle, "Service lifecycle");
            if lifecycle.state != ServiceState::Running {
                return;
            }
            warn!("Service killed externally");
            self.teardown(&mut lifecycle);
            Self::transition(&mut lifecycle, ServiceState::Stopped);
        }

        let sticky = self.restart_policy == RestartPolicy::Sticky;
        if !(sticky && self.platform.supports_sticky_restart()) {
            warn!("No automatic restart; protection inactive");
            return;
        }
        let attempt = self.components.status.record_restart();
        info!("Restarting service (restart #{attempt})");
        if let Err(e) = self.start() {
            warn!("Service restart failed: {e}");
        }
    }

    fn teardown(&self, lifecycle: &mut Lifecycle) {
        self.components.receiver.unsubscribe();
        self.components.watcher.stop();
        if let Some(dispatch) = lifecycle.dispatch.take() {
            // Queued triggers run before the shutdown marker.
            let _ = dispatch.sender.send(Trigger::Shutdown);
            if dispatch.worker.join().is_err() {
                warn!("Dispatch thread panicked");
            }
        }
        self.components.overlay.hide();
        self.platform.withdraw_status_indicator();
        self.platform.release_foreground_grant();
        lifecycle.started_at_ms = None;
        self.components.status.set_protection_active(false);
    }

    fn submit(&self, trigger: Trigger) -> Result<(), GuardError> {
        let lifecycle = safe_lock(&self.lifecycle, "Service lifecycle");
        let dispatch = lifecycle
            .dispatch
            .as_ref()
            .filter(|_| lifecycle.state == ServiceState::Running)
            .ok_or(GuardError::NotRunning)?;
        dispatch.sender.send(trigger).map_err(|_| GuardError::NotRunning)
    }

    /// Route a developer-triggered overlay through the coordinator.
    pub fn request_manual_test(&self, request: OverlayRequest) -> Result<(), GuardError> {
        self.submit(Trigger::Manual(request))
    }

    pub fn reset_session(&self) -> Result<(), GuardError> {
        self.submit(Trigger::ResetSession)
    }
}

impl Drop for BackgroundServiceHost {
    fn drop(&mut self) {
        self.stop();
    }
}
