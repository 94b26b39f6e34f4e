use crate::error::GuardError;
use crate::models::{MediaRef, OverlayKind, OverlayRequest, TriggerSource};
use crate::validation::validate_message;
use std::time::Duration;

/// Build a manual-test overlay request from untrusted text input.
pub fn manual_request(
    kind: &str,
    message: &str,
    media: Option<&str>,
    auto_hide: Option<Duration>,
) -> Result<OverlayRequest, GuardError> {
    let kind = OverlayKind::parse(kind).ok_or_else(|| GuardError::InvalidInput {
        field: "kind",
        reason: "must be 'dismissible', 'animated_loop', or 'forced_block'".into(),
    })?;
    let message = validate_message(message)?;
    let media_ref = media.map(MediaRef::parse).transpose()?;

    let request = OverlayRequest::new(kind, message, media_ref, TriggerSource::ManualTest);
    Ok(match auto_hide {
        Some(after) => request.with_auto_hide(after),
        None => request,
    })
}

/// One of the canned session reminders: `break` or `focus`.
pub fn preset_request(name: &str) -> Result<OverlayRequest, GuardError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "break" => Ok(OverlayRequest::break_reminder()),
        "focus" => Ok(OverlayRequest::focus_reminder()),
        _ => Err(GuardError::InvalidInput {
            field: "preset",
            reason: "must be 'break' or 'focus'".into(),
        }),
    }
}
