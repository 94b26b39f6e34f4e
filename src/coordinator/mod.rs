//! Intervention Coordinator.
//!
//! Decides what the overlay should do for each trigger. It holds no overlay
//! state of its own: every decision is a `show` or `hide` on the surface
//! manager, which keeps the at-most-one guarantee.

mod policy;

pub use policy::{policy_from_config, EscalationPolicy, NeverEscalate, RepeatVisitEscalation};

use crate::classifier::Classifier;
use crate::models::{ForegroundAppEvent, ForegroundSignal, OverlayKind, OverlayRequest, OverlaySurfaceHandle};
use crate::overlay::{OverlaySurfaceManager, ShowRejected};
use crate::remote::RemoteCommand;
use log::{debug, info, warn};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Everything that can reach the coordinator, funneled through one channel.
#[derive(Debug, Clone)]
pub enum Trigger {
    Foreground(ForegroundSignal),
    Remote(RemoteCommand),
    Manual(OverlayRequest),
    /// Start a new escalation session.
    ResetSession,
    Shutdown,
}

/// What a trigger did to the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Shown(OverlaySurfaceHandle),
    /// The same kind was already on screen.
    Kept(OverlaySurfaceHandle),
    /// No surface could be drawn; a fallback notification may have been posted.
    Degraded,
    Hidden,
    Ignored,
}

pub struct InterventionCoordinator {
    classifier: Arc<Classifier>,
    overlay: OverlaySurfaceManager,
    policy: Box<dyn EscalationPolicy>,
    last_app_id: Option<String>,
    last_kind: OverlayKind,
}

impl InterventionCoordinator {
    pub fn new(classifier: Arc<Classifier>, overlay: OverlaySurfaceManager, policy: Box<dyn EscalationPolicy>) -> Self {
        Self {
            classifier,
            overlay,
            policy,
            last_app_id: None,
            last_kind: OverlayKind::Dismissible,
        }
    }

    pub fn handle(&mut self, trigger: Trigger) -> Decision {
        match trigger {
            Trigger::Foreground(ForegroundSignal::Changed(event)) => self.on_foreground_app_event(&event),
            Trigger::Foreground(ForegroundSignal::Departed { .. }) => self.on_foreground_departed(),
            Trigger::Remote(command) => self.on_remote_command(&command),
            Trigger::Manual(request) => self.on_manual_test_request(&request),
            Trigger::ResetSession => {
                self.reset_session();
                Decision::Ignored
            }
            Trigger::Shutdown => Decision::Ignored,
        }
    }

    /// Drain `triggers` in arrival order until `Shutdown` or every sender is gone.
    pub fn run(mut self, triggers: &Receiver<Trigger>) {
        for trigger in triggers {
            if matches!(trigger, Trigger::Shutdown) {
                debug!("Coordinator shutting down");
                break;
            }
            let decision = self.handle(trigger);
            debug!("Coordinator decision: {decision:?}");
        }
    }

    pub fn on_foreground_app_event(&mut self, event: &ForegroundAppEvent) -> Decision {
        let classification = self.classifier.classify(&event.app_id);
        let is_new_visit = self.last_app_id.as_deref() != Some(event.app_id.as_str());
        self.last_app_id = Some(event.app_id.clone());

        let Some(rule) = classification.rule else {
            debug!("{} is not distracting", event.app_id);
            self.overlay.hide();
            return Decision::Hidden;
        };

        if is_new_visit {
            self.last_kind = self.policy.kind_for_visit(&event.app_id, &rule);
        }
        info!("Distracting app {} ({}), showing {}", rule.display_name, rule.category.as_str(), self.last_kind);
        let request = OverlayRequest::distraction_alert(&rule, self.last_kind);
        self.show(&request)
    }

    /// The user went home or back into the host app.
    pub fn on_foreground_departed(&mut self) -> Decision {
        self.last_app_id = None;
        self.overlay.hide();
        Decision::Hidden
    }

    /// Remote commands are trusted: no classification, no escalation.
    /// With both flags set the live overlay is hidden first, then the new one shown.
    pub fn on_remote_command(&mut self, command: &RemoteCommand) -> Decision {
        if command.hide {
            info!("Remote command: hide overlay");
            self.overlay.hide();
        }
        if command.show {
            info!("Remote command: show {} overlay", command.kind);
            return self.show(&command.to_request());
        }
        if command.hide {
            Decision::Hidden
        } else {
            Decision::Ignored
        }
    }

    pub fn on_manual_test_request(&mut self, request: &OverlayRequest) -> Decision {
        info!("Manual trigger: {} overlay", request.kind());
        self.show(request)
    }

    pub fn reset_session(&mut self) {
        self.policy.reset();
        self.last_app_id = None;
        self.last_kind = OverlayKind::Dismissible;
        debug!("Escalation session reset");
    }

    fn show(&self, request: &OverlayRequest) -> Decision {
        match self.overlay.show(request) {
            Ok(handle) => Decision::Shown(handle),
            Err(ShowRejected::AlreadyShowing(handle)) => Decision::Kept(handle),
            Err(e @ (ShowRejected::Inert | ShowRejected::RenderFailed(_))) => {
                warn!("Overlay not shown: {e}");
                Decision::Degraded
            }
        }
    }
}
