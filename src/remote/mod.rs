//! Remote Command Receiver.
//!
//! Push transport is someone else's job; this module turns a delivered
//! key/value payload into a [`RemoteCommand`] and forwards it to whoever
//! subscribed (the running service host).

use crate::constants::{DEFAULT_REMINDER_MESSAGE, MAX_MESSAGE_LEN};
use crate::coordinator::Trigger;
use crate::error::GuardError;
use crate::models::{MediaRef, OverlayKind, OverlayRequest, TriggerSource};
use crate::safe_lock;
use log::{debug, warn};
use serde_json::Value;
use std::io::BufRead;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

const KEY_SHOW: &str = "show_overlay";
const KEY_HIDE: &str = "hide_overlay";
const KEY_KIND: &str = "overlay_kind";
const KEY_MESSAGE: &str = "overlay_message";
const KEY_MEDIA: &str = "media_ref";

/// A normalized show/hide instruction from the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    pub show: bool,
    pub hide: bool,
    pub kind: OverlayKind,
    pub message: String,
    pub media_ref: Option<MediaRef>,
}

impl Default for RemoteCommand {
    fn default() -> Self {
        Self {
            show: false,
            hide: false,
            kind: OverlayKind::Dismissible,
            message: DEFAULT_REMINDER_MESSAGE.to_string(),
            media_ref: None,
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn normalize_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_REMINDER_MESSAGE.to_string();
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        warn!("Remote overlay message truncated to {MAX_MESSAGE_LEN} characters");
        return trimmed.chars().take(MAX_MESSAGE_LEN).collect();
    }
    trimmed.to_string()
}

impl RemoteCommand {
    /// Decode a key/value payload. Unknown keys are ignored and bad values
    /// fall back to defaults, so decoding itself never fails.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut command = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                KEY_SHOW => command.show = parse_flag(value),
                KEY_HIDE => command.hide = parse_flag(value),
                KEY_KIND => {
                    command.kind = OverlayKind::parse(value).unwrap_or_else(|| {
                        warn!("Unknown overlay kind '{value}', using dismissible");
                        OverlayKind::Dismissible
                    });
                }
                KEY_MESSAGE => command.message = normalize_message(value),
                KEY_MEDIA => match MediaRef::parse(value) {
                    Ok(media) => command.media_ref = Some(media),
                    Err(e) => warn!("Dropping media reference: {e}"),
                },
                other => debug!("Ignoring remote payload key '{other}'"),
            }
        }
        command
    }

    /// Decode a JSON object payload. Scalar values are read as their text form.
    pub fn from_json(raw: &str) -> Result<Self, GuardError> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(map) = value else {
            return Err(GuardError::InvalidInput {
                field: "payload",
                reason: "expected a JSON object".into(),
            });
        };

        let pairs = map.into_iter().filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null | Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key, text))
        });
        Ok(Self::from_pairs(pairs))
    }

    pub fn is_noop(&self) -> bool {
        !self.show && !self.hide
    }

    pub fn to_request(&self) -> OverlayRequest {
        OverlayRequest::new(
            self.kind,
            self.message.clone(),
            self.media_ref.clone(),
            TriggerSource::RemoteCommand,
        )
    }
}

/// Hands decoded commands to the current subscriber. With no subscriber
/// the command is dropped and logged.
#[derive(Default)]
pub struct RemoteCommandReceiver {
    subscriber: Mutex<Option<Sender<Trigger>>>,
}

impl RemoteCommandReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sender: Sender<Trigger>) {
        *safe_lock(&self.subscriber, "Remote subscriber") = Some(sender);
        debug!("Remote command receiver subscribed");
    }

    pub fn unsubscribe(&self) {
        if safe_lock(&self.subscriber, "Remote subscriber").take().is_some() {
            debug!("Remote command receiver unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        safe_lock(&self.subscriber, "Remote subscriber").is_some()
    }

    /// Returns whether the command reached a subscriber.
    pub fn deliver(&self, command: RemoteCommand) -> bool {
        if command.is_noop() {
            debug!("Remote payload carries neither show nor hide, ignoring");
            return false;
        }
        let mut subscriber = safe_lock(&self.subscriber, "Remote subscriber");
        let Some(sender) = subscriber.as_ref() else {
            warn!("Remote command dropped: engine not running");
            return false;
        };
        if sender.send(Trigger::Remote(command)).is_err() {
            warn!("Remote command dropped: dispatcher gone");
            *subscriber = None;
            return false;
        }
        true
    }

    pub fn deliver_pairs<I, K, V>(&self, pairs: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.deliver(RemoteCommand::from_pairs(pairs))
    }

    pub fn deliver_json(&self, raw: &str) -> Result<bool, GuardError> {
        Ok(self.deliver(RemoteCommand::from_json(raw)?))
    }

    /// Deliver one JSON payload per line until `input` ends. Blank and
    /// malformed lines are skipped. Ending the input leaves the subscriber
    /// in place. Returns how many commands were delivered.
    pub fn deliver_lines<R: BufRead>(&self, input: R) -> usize {
        let mut delivered = 0;
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Stopped reading remote payloads: {e}");
                    break;
                }
            };
            let payload = line.trim();
            if payload.is_empty() {
                continue;
            }
            match self.deliver_json(payload) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(e) => warn!("Ignoring remote payload: {e}"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_defaults_when_keys_missing() {
        let command = RemoteCommand::from_pairs([("show_overlay", "true")]);
        assert!(command.show);
        assert!(!command.hide);
        assert_eq!(command.kind, OverlayKind::Dismissible);
        assert_eq!(command.message, DEFAULT_REMINDER_MESSAGE);
        assert!(command.media_ref.is_none());
    }

    #[test]
    fn test_full_payload() {
        let command = RemoteCommand::from_pairs([
            ("show_overlay", "1"),
            ("overlay_kind", "type3"),
            ("overlay_message", "  Put it down  "),
            ("media_ref", "https://cdn.example.com/loop.gif"),
            ("title", "ignored"),
        ]);
        assert_eq!(command.kind, OverlayKind::ForcedBlock);
        assert_eq!(command.message, "Put it down");
        assert!(matches!(command.media_ref, Some(MediaRef::Remote(_))));

        let request = command.to_request();
        assert_eq!(request.source(), TriggerSource::RemoteCommand);
        assert_eq!(request.kind(), OverlayKind::ForcedBlock);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let command = RemoteCommand::from_pairs([
            ("show_overlay", "nope"),
            ("hide_overlay", "YES"),
            ("overlay_kind", "fullscreen"),
            ("overlay_message", "   "),
            ("media_ref", "/etc/passwd"),
        ]);
        assert!(!command.show);
        assert!(command.hide);
        assert_eq!(command.kind, OverlayKind::Dismissible);
        assert_eq!(command.message, DEFAULT_REMINDER_MESSAGE);
        assert!(command.media_ref.is_none());
    }

    #[test]
    fn test_long_message_is_truncated() {
        let long = "x".repeat(MAX_MESSAGE_LEN + 20);
        let command = RemoteCommand::from_pairs([("overlay_message", long.as_str())]);
        assert_eq!(command.message.chars().count(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn test_from_json_accepts_native_bools() {
        let command = RemoteCommand::from_json(
            r#"{"show_overlay": true, "overlay_kind": "gif_loop", "extra": [1, 2]}"#,
        )
        .unwrap();
        assert!(command.show);
        assert_eq!(command.kind, OverlayKind::AnimatedLoop);
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(matches!(RemoteCommand::from_json("[1]"), Err(GuardError::InvalidInput { .. })));
        assert!(matches!(RemoteCommand::from_json("{oops"), Err(GuardError::Json(_))));
    }

    #[test]
    fn test_receiver_forwards_only_when_subscribed() {
        let receiver = RemoteCommandReceiver::new();
        assert!(!receiver.deliver_pairs([("show_overlay", "true")]));

        let (tx, rx) = mpsc::channel();
        receiver.subscribe(tx);
        assert!(receiver.deliver_pairs([("show_overlay", "true")]));
        assert!(matches!(rx.try_recv(), Ok(Trigger::Remote(c)) if c.show));

        receiver.unsubscribe();
        assert!(!receiver.is_subscribed());
        assert!(!receiver.deliver_pairs([("show_overlay", "true")]));
    }

    #[test]
    fn test_receiver_ignores_noop_payloads() {
        let receiver = RemoteCommandReceiver::new();
        let (tx, rx) = mpsc::channel();
        receiver.subscribe(tx);
        assert!(!receiver.deliver_json(r#"{"title": "hi"}"#).unwrap());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_receiver_drops_dead_subscriber() {
        let receiver = RemoteCommandReceiver::new();
        let (tx, rx) = mpsc::channel();
        receiver.subscribe(tx);
        drop(rx);
        assert!(!receiver.deliver_pairs([("hide_overlay", "true")]));
        assert!(!receiver.is_subscribed());
    }

    #[test]
    fn test_deliver_lines_skips_bad_input_and_keeps_subscriber() {
        let receiver = RemoteCommandReceiver::new();
        let (tx, rx) = mpsc::channel();
        receiver.subscribe(tx);

        let input = "\n{\"show_overlay\": true}\nnot json\n{\"message\": \"no flags\"}\n{\"hide_overlay\": \"1\"}\n";
        assert_eq!(receiver.deliver_lines(input.as_bytes()), 2);

        let triggers: Vec<_> = rx.try_iter().collect();
        assert!(matches!(triggers.first(), Some(Trigger::Remote(c)) if c.show));
        assert!(matches!(triggers.get(1), Some(Trigger::Remote(c)) if c.hide));
        assert!(receiver.is_subscribed());
    }
}
