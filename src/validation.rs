use crate::constants::{
    MAX_APP_ID_LEN, MAX_AUTO_HIDE_MS, MAX_DEBOUNCE_MS, MAX_DISPLAY_NAME_LEN, MAX_MESSAGE_LEN,
    MAX_POLL_INTERVAL_MS, MIN_AUTO_HIDE_MS, MIN_POLL_INTERVAL_MS,
};
use crate::error::GuardError;

/// Validate an application identifier (package name, bundle id or window class).
pub fn validate_app_id(app_id: &str) -> Result<&str, GuardError> {
    let app_id = app_id.trim();
    if app_id.is_empty() {
        return Err(GuardError::InvalidInput {
            field: "app_id",
            reason: "cannot be empty".into(),
        });
    }
    if app_id.len() > MAX_APP_ID_LEN {
        return Err(GuardError::InvalidInput {
            field: "app_id",
            reason: format!("cannot exceed {MAX_APP_ID_LEN} characters"),
        });
    }
    if app_id.chars().any(char::is_whitespace) {
        return Err(GuardError::InvalidInput {
            field: "app_id",
            reason: "cannot contain whitespace".into(),
        });
    }
    Ok(app_id)
}

/// Validate a rule's display name.
pub fn validate_display_name(name: &str) -> Result<&str, GuardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GuardError::InvalidInput {
            field: "display_name",
            reason: "cannot be empty".into(),
        });
    }
    if name.len() > MAX_DISPLAY_NAME_LEN {
        return Err(GuardError::InvalidInput {
            field: "display_name",
            reason: format!("cannot exceed {MAX_DISPLAY_NAME_LEN} characters"),
        });
    }
    Ok(name)
}

/// Validate overlay message text.
pub fn validate_message(message: &str) -> Result<&str, GuardError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(GuardError::InvalidInput {
            field: "message",
            reason: "cannot be empty".into(),
        });
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(GuardError::InvalidInput {
            field: "message",
            reason: format!("cannot exceed {MAX_MESSAGE_LEN} characters"),
        });
    }
    Ok(message)
}

pub fn validate_debounce_ms(debounce_ms: u64) -> Result<(), GuardError> {
    if debounce_ms > MAX_DEBOUNCE_MS {
        return Err(GuardError::InvalidInput {
            field: "debounce_ms",
            reason: format!("cannot exceed {MAX_DEBOUNCE_MS}"),
        });
    }
    Ok(())
}

pub fn validate_poll_interval_ms(interval_ms: u64) -> Result<(), GuardError> {
    if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&interval_ms) {
        return Err(GuardError::InvalidInput {
            field: "poll_interval_ms",
            reason: format!("must be {MIN_POLL_INTERVAL_MS}-{MAX_POLL_INTERVAL_MS}"),
        });
    }
    Ok(())
}

/// A zero delay would hide the overlay as soon as it appears.
pub fn validate_auto_hide_ms(field: &'static str, delay_ms: u64) -> Result<(), GuardError> {
    if !(MIN_AUTO_HIDE_MS..=MAX_AUTO_HIDE_MS).contains(&delay_ms) {
        return Err(GuardError::InvalidInput {
            field,
            reason: format!("must be {MIN_AUTO_HIDE_MS}-{MAX_AUTO_HIDE_MS} (use null to disable auto-hide)"),
        });
    }
    Ok(())
}

pub fn validate_escalation_threshold(visits: u32) -> Result<(), GuardError> {
    if visits == 0 {
        return Err(GuardError::InvalidInput {
            field: "escalate_after_visits",
            reason: "must be at least 1 (use null to disable escalation)".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_app_id_trims() {
        assert_eq!(validate_app_id("  com.instagram.android ").unwrap(), "com.instagram.android");
    }

    #[test]
    fn test_validate_app_id_invalid() {
        assert!(validate_app_id("").is_err());
        assert!(validate_app_id("   ").is_err());
        assert!(validate_app_id("com.bad id").is_err());
        assert!(validate_app_id(&"a".repeat(MAX_APP_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_display_name() {
        assert_eq!(validate_display_name(" YouTube ").unwrap(), "YouTube");
        assert!(validate_display_name("").is_err());
    }

    #[test]
    fn test_validate_message_counts_chars_not_bytes() {
        let message = "專".repeat(MAX_MESSAGE_LEN);
        assert!(validate_message(&message).is_ok());
        assert!(validate_message(&format!("{message}!")).is_err());
    }

    #[test]
    fn test_validate_poll_interval_bounds() {
        assert!(validate_poll_interval_ms(MIN_POLL_INTERVAL_MS).is_ok());
        assert!(validate_poll_interval_ms(MIN_POLL_INTERVAL_MS - 1).is_err());
        assert!(validate_poll_interval_ms(MAX_POLL_INTERVAL_MS + 1).is_err());
    }

    #[test]
    fn test_validate_escalation_threshold() {
        assert!(validate_escalation_threshold(1).is_ok());
        assert!(validate_escalation_threshold(0).is_err());
    }

    #[test]
    fn test_validate_auto_hide_bounds() {
        assert!(validate_auto_hide_ms("dismissible_timeout_ms", MIN_AUTO_HIDE_MS).is_ok());
        assert!(matches!(
            validate_auto_hide_ms("dismissible_timeout_ms", 0),
            Err(GuardError::InvalidInput { field: "dismissible_timeout_ms", .. })
        ));
        assert!(validate_auto_hide_ms("animated_loop_timeout_ms", MAX_AUTO_HIDE_MS + 1).is_err());
    }
}
