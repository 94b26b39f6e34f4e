use crate::config::GuardConfig;
use crate::models::{DistractingAppRule, OverlayKind};
use std::collections::HashMap;

/// Chooses the overlay kind for a local detection. Swappable without
/// touching the watcher or the surface manager.
pub trait EscalationPolicy: Send {
    /// Called once per visit: each time the foreground moves into `app_id`,
    /// which `rule` matched.
    fn kind_for_visit(&mut self, app_id: &str, rule: &DistractingAppRule) -> OverlayKind;

    /// Forget everything counted so far (new session).
    fn reset(&mut self);
}

/// Dismissible reminders until the same app has been opened `threshold`
/// times in this session, forced blocks from then on. Counted per app id,
/// so apps sharing a wildcard rule escalate independently.
#[derive(Debug, Clone)]
pub struct RepeatVisitEscalation {
    threshold: u32,
    visits: HashMap<String, u32>,
}

impl RepeatVisitEscalation {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            visits: HashMap::new(),
        }
    }

    pub fn visits(&self, app_id: &str) -> u32 {
        self.visits.get(app_id).copied().unwrap_or(0)
    }
}

impl EscalationPolicy for RepeatVisitEscalation {
    fn kind_for_visit(&mut self, app_id: &str, _rule: &DistractingAppRule) -> OverlayKind {
        let count = self.visits.entry(app_id.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        if *count >= self.threshold {
            OverlayKind::ForcedBlock
        } else {
            OverlayKind::Dismissible
        }
    }

    fn reset(&mut self) {
        self.visits.clear();
    }
}

/// Always a dismissible reminder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEscalate;

impl EscalationPolicy for NeverEscalate {
    fn kind_for_visit(&mut self, _app_id: &str, _rule: &DistractingAppRule) -> OverlayKind {
        OverlayKind::Dismissible
    }

    fn reset(&mut self) {}
}

pub fn policy_from_config(config: &GuardConfig) -> Box<dyn EscalationPolicy> {
    match config.escalate_after_visits {
        Some(threshold) => Box::new(RepeatVisitEscalation::new(threshold)),
        None => Box::new(NeverEscalate),
    }
}
