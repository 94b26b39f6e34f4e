//! Engine configuration.
//!
//! Stored as JSON under the platform config directory. Every field has a
//! default, so a missing file (or a partial one) is always usable.

use crate::constants::{
    DEFAULT_ANIMATED_LOOP_TIMEOUT_MS, DEFAULT_DEBOUNCE_MS, DEFAULT_ESCALATE_AFTER_VISITS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SELF_APP_ID,
};
use crate::error::GuardError;
use crate::models::OverlayKind;
use crate::validation::{
    validate_app_id, validate_auto_hide_ms, validate_debounce_ms, validate_escalation_threshold,
    validate_poll_interval_ms,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "guard.json";
const DATABASE_FILE_NAME: &str = "guard.db";

/// Which foreground source the watcher should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchStrategyPreference {
    /// Push when the platform allows it, otherwise poll.
    #[default]
    Auto,
    Push,
    Poll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Ask to be restarted after an external kill.
    #[default]
    Sticky,
    Never,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
    pub watch_strategy: WatchStrategyPreference,
    pub self_app_id: String,
    pub home_app_id: Option<String>,
    pub escalate_after_visits: Option<u32>,
    pub dismissible_timeout_ms: Option<u64>,
    pub animated_loop_timeout_ms: Option<u64>,
    pub restart_policy: RestartPolicy,
    pub database_path: Option<PathBuf>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            watch_strategy: WatchStrategyPreference::Auto,
            self_app_id: DEFAULT_SELF_APP_ID.to_string(),
            home_app_id: None,
            escalate_after_visits: Some(DEFAULT_ESCALATE_AFTER_VISITS),
            dismissible_timeout_ms: None,
            animated_loop_timeout_ms: Some(DEFAULT_ANIMATED_LOOP_TIMEOUT_MS),
            restart_policy: RestartPolicy::Sticky,
            database_path: None,
        }
    }
}

pub fn project_dirs() -> Result<ProjectDirs, GuardError> {
    ProjectDirs::from("com", "taichi_mochi", "MochiGuard").ok_or(GuardError::NoProjectDirs)
}

pub fn default_config_path() -> Result<PathBuf, GuardError> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

impl GuardConfig {
    /// Load from `path`. A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, GuardError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), GuardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GuardError> {
        validate_debounce_ms(self.debounce_ms)?;
        validate_poll_interval_ms(self.poll_interval_ms)?;
        validate_app_id(&self.self_app_id)?;
        if let Some(home) = &self.home_app_id {
            validate_app_id(home)?;
        }
        if let Some(visits) = self.escalate_after_visits {
            validate_escalation_threshold(visits)?;
        }
        if let Some(delay) = self.dismissible_timeout_ms {
            validate_auto_hide_ms("dismissible_timeout_ms", delay)?;
        }
        if let Some(delay) = self.animated_loop_timeout_ms {
            validate_auto_hide_ms("animated_loop_timeout_ms", delay)?;
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Configured self-cancel delay for `kind`; forced blocks never self-cancel.
    pub fn auto_hide_for(&self, kind: OverlayKind) -> Option<Duration> {
        let millis = match kind {
            OverlayKind::Dismissible => self.dismissible_timeout_ms,
            OverlayKind::AnimatedLoop => self.animated_loop_timeout_ms,
            OverlayKind::ForcedBlock => None,
        };
        millis.map(Duration::from_millis)
    }

    pub fn resolve_database_path(&self) -> Result<PathBuf, GuardError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dirs = project_dirs()?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join(DATABASE_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.self_app_id, "com.taichi_mochi");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = GuardConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, GuardConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, r#"{"escalate_after_visits": null, "watch_strategy": "poll"}"#).unwrap();

        let config = GuardConfig::load(&path).unwrap();
        assert_eq!(config.escalate_after_visits, None);
        assert_eq!(config.watch_strategy, WatchStrategyPreference::Poll);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(GuardConfig::load(&path), Err(GuardError::Json(_))));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, r#"{"debounce": 10}"#).unwrap();
        assert!(GuardConfig::load(&path).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, r#"{"poll_interval_ms": 5}"#).unwrap();
        assert!(matches!(
            GuardConfig::load(&path),
            Err(GuardError::InvalidInput { field: "poll_interval_ms", .. })
        ));
    }

    #[test]
    fn test_zero_auto_hide_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guard.json");
        std::fs::write(&path, r#"{"animated_loop_timeout_ms": 0}"#).unwrap();
        assert!(matches!(
            GuardConfig::load(&path),
            Err(GuardError::InvalidInput { field: "animated_loop_timeout_ms", .. })
        ));

        std::fs::write(&path, r#"{"dismissible_timeout_ms": null}"#).unwrap();
        assert_eq!(GuardConfig::load(&path).unwrap().dismissible_timeout_ms, None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("guard.json");
        let config = GuardConfig {
            home_app_id: Some("com.android.launcher3".into()),
            dismissible_timeout_ms: Some(8_000),
            ..GuardConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(GuardConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_forced_block_never_auto_hides() {
        let config = GuardConfig {
            dismissible_timeout_ms: Some(1_000),
            ..GuardConfig::default()
        };
        assert_eq!(config.auto_hide_for(OverlayKind::Dismissible), Some(Duration::from_secs(1)));
        assert!(config.auto_hide_for(OverlayKind::AnimatedLoop).is_some());
        assert_eq!(config.auto_hide_for(OverlayKind::ForcedBlock), None);
    }
}
