use super::{ForegroundSource, FrontmostQuery, RawFocusEvent, SourceError, WatchStrategy};
use log::debug;
use std::thread;
use std::time::{Duration, Instant};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeWindowAttributesAux, ConnectionExt, EventMask, Window,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

/// How often the push source checks the socket while waiting for PropertyNotify.
const EVENT_POLL_STEP: Duration = Duration::from_millis(20);

fn unavailable(e: impl std::fmt::Display) -> SourceError {
    SourceError::Unavailable(e.to_string())
}

fn transient(e: impl std::fmt::Display) -> SourceError {
    SourceError::Transient(e.to_string())
}

struct Atoms {
    net_active_window: Atom,
    net_client_list: Atom,
    net_wm_window_type: Atom,
    net_wm_window_type_desktop: Atom,
}

/// An X11 display connection that answers "which window class is focused".
/// The WM_CLASS class name stands in for the app id.
pub struct X11Display {
    conn: RustConnection,
    root: Window,
    atoms: Atoms,
}

impl X11Display {
    pub fn connect() -> Result<Self, SourceError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(unavailable)?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| unavailable(format!("screen {screen_num} not found")))?;

        let intern = |name: &[u8]| -> Result<Atom, SourceError> {
            Ok(conn.intern_atom(false, name).map_err(unavailable)?.reply().map_err(unavailable)?.atom)
        };
        let atoms = Atoms {
            net_active_window: intern(b"_NET_ACTIVE_WINDOW")?,
            net_client_list: intern(b"_NET_CLIENT_LIST")?,
            net_wm_window_type: intern(b"_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_desktop: intern(b"_NET_WM_WINDOW_TYPE_DESKTOP")?,
        };

        Ok(Self { conn, root, atoms })
    }

    fn active_window(&self) -> Result<Option<Window>, SourceError> {
        let reply = self
            .conn
            .get_property(false, self.root, self.atoms.net_active_window, AtomEnum::WINDOW, 0, 1)
            .map_err(unavailable)?
            .reply()
            .map_err(transient)?;
        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|&window| window != x11rb::NONE))
    }

    fn window_class(&self, window: Window) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        // "instance\0class\0": prefer the class, fall back to the instance.
        let raw = String::from_utf8_lossy(&reply.value);
        let mut parts = raw.split('\0').filter(|part| !part.is_empty());
        let instance = parts.next();
        parts.next().or(instance).map(String::from)
    }

    fn window_types(&self, window: Window) -> Vec<Atom> {
        self.conn
            .get_property(false, window, self.atoms.net_wm_window_type, AtomEnum::ATOM, 0, 32)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(Iterator::collect))
            .unwrap_or_default()
    }

    /// The class of the desktop window, if the window manager exposes one.
    fn desktop_class(&self) -> Option<String> {
        let clients: Vec<Window> = self
            .conn
            .get_property(false, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, 0, 1024)
            .ok()?
            .reply()
            .ok()?
            .value32()?
            .collect();

        clients
            .into_iter()
            .find(|&window| self.window_types(window).contains(&self.atoms.net_wm_window_type_desktop))
            .and_then(|window| self.window_class(window))
    }

    fn focused_class(&self) -> Result<Option<String>, SourceError> {
        Ok(self.active_window()?.and_then(|window| self.window_class(window)))
    }
}

impl FrontmostQuery for X11Display {
    fn frontmost_app_id(&self) -> Result<Option<String>, SourceError> {
        self.focused_class()
    }

    fn home_app_id(&self) -> Option<String> {
        self.desktop_class()
    }
}

/// Reacts to `_NET_ACTIVE_WINDOW` PropertyNotify on the root window.
pub struct X11PushSource {
    display: X11Display,
    last_reported: Option<String>,
    initial_pending: bool,
}

impl X11PushSource {
    pub fn connect() -> Result<Self, SourceError> {
        let display = X11Display::connect()?;
        let aux = ChangeWindowAttributesAux::new().event_mask(EventMask::PROPERTY_CHANGE);
        display
            .conn
            .change_window_attributes(display.root, &aux)
            .map_err(unavailable)?
            .check()
            .map_err(unavailable)?;
        display.conn.flush().map_err(unavailable)?;
        debug!("Subscribed to _NET_ACTIVE_WINDOW changes");

        Ok(Self {
            display,
            last_reported: None,
            initial_pending: true,
        })
    }

    fn report_if_changed(&mut self) -> Result<Option<RawFocusEvent>, SourceError> {
        let Some(class) = self.display.focused_class()? else {
            return Ok(None);
        };
        if self.last_reported.as_deref() == Some(class.as_str()) {
            return Ok(None);
        }
        self.last_reported = Some(class.clone());
        Ok(Some(RawFocusEvent::observed_now(class)))
    }
}

impl ForegroundSource for X11PushSource {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Push
    }

    fn resolve_home_app_id(&mut self) -> Option<String> {
        self.display.desktop_class()
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError> {
        if self.initial_pending {
            self.initial_pending = false;
            if let Some(event) = self.report_if_changed()? {
                return Ok(Some(event));
            }
        }

        let deadline = Instant::now() + timeout;
        loop {
            match self.display.conn.poll_for_event().map_err(unavailable)? {
                Some(event) => {
                    let focus_moved = matches!(
                        event,
                        Event::PropertyNotify(ref notify)
                            if notify.atom == self.display.atoms.net_active_window
                    );
                    if focus_moved {
                        if let Some(event) = self.report_if_changed()? {
                            return Ok(Some(event));
                        }
                    }
                }
                None => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(EVENT_POLL_STEP.min(deadline - now));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires an X11 display"]
    fn test_focused_class_on_live_display() {
        let display = X11Display::connect().unwrap();
        let class = display.frontmost_app_id().unwrap();
        log::info!("Focused window class: {class:?}");
    }

    #[test]
    #[ignore = "requires an X11 display"]
    fn test_push_source_reports_current_window_first() {
        let mut source = X11PushSource::connect().unwrap();
        assert_eq!(source.strategy(), WatchStrategy::Push);
        let _ = source.next_event(Duration::from_millis(50)).unwrap();
    }
}
