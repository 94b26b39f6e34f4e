//! Flags the host UI polls to explain why protection is degraded.
//!
//! Each flag is raised at most once per cause and logged only on the
//! transition, so a revoked permission does not turn into a log storm.

use log::warn;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Debug, Default)]
pub struct EngineStatus {
    overlay_permission_missing: AtomicBool,
    foreground_access_missing: AtomicBool,
    protection_active: AtomicBool,
    restarts: AtomicU32,
}

/// Point-in-time copy of [`EngineStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub overlay_permission_missing: bool,
    pub foreground_access_missing: bool,
    pub protection_active: bool,
    pub restarts: u32,
}

impl EngineStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the call that raised the flag.
    pub fn flag_overlay_permission_missing(&self) -> bool {
        let first = !self.overlay_permission_missing.swap(true, Ordering::SeqCst);
        if first {
            warn!("Overlay permission missing: interventions degrade to notifications");
        }
        first
    }

    pub fn clear_overlay_permission_missing(&self) {
        self.overlay_permission_missing.store(false, Ordering::SeqCst);
    }

    /// Returns true only for the call that raised the flag.
    pub fn flag_foreground_access_missing(&self) -> bool {
        let first = !self.foreground_access_missing.swap(true, Ordering::SeqCst);
        if first {
            warn!("Foreground access missing: watcher is inert");
        }
        first
    }

    pub fn clear_foreground_access_missing(&self) {
        self.foreground_access_missing.store(false, Ordering::SeqCst);
    }

    pub fn set_protection_active(&self, active: bool) {
        self.protection_active.store(active, Ordering::SeqCst);
    }

    pub fn record_restart(&self) -> u32 {
        self.restarts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn snapshot(&self) -> StatusReport {
        StatusReport {
            overlay_permission_missing: self.overlay_permission_missing.load(Ordering::SeqCst),
            foreground_access_missing: self.foreground_access_missing.load(Ordering::SeqCst),
            protection_active: self.protection_active.load(Ordering::SeqCst),
            restarts: self.restarts.load(Ordering::SeqCst),
        }
    }
}
