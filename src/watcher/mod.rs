//! Foreground Watcher.
//!
//! Pulls raw focus transitions from a [`ForegroundSource`] on a dedicated
//! thread, filters out the launcher and the host app, debounces flapping
//! callbacks and hands the result to a single subscriber.

use crate::config::GuardConfig;
use crate::constants::WATCHER_TICK_MS;
use crate::models::{ForegroundAppEvent, ForegroundSignal};
use crate::platform::{ForegroundSource, SourceError, WatchStrategy};
use crate::safe_lock;
use crate::status::EngineStatus;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type SignalCallback = Box<dyn FnMut(ForegroundSignal) + Send>;

/// The watcher's own view of the foreground. Only the watcher thread mutates it.
#[derive(Debug, Clone)]
pub struct ForegroundAppState {
    current_app_id: Option<String>,
    last_change_at_ms: Option<i64>,
    home_app_id: Option<String>,
    self_app_id: String,
    debounce_ms: i64,
}

impl ForegroundAppState {
    pub fn new(self_app_id: impl Into<String>, home_app_id: Option<String>, debounce: Duration) -> Self {
        Self {
            current_app_id: None,
            last_change_at_ms: None,
            home_app_id,
            self_app_id: self_app_id.into(),
            debounce_ms: i64::try_from(debounce.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn current_app_id(&self) -> Option<&str> {
        self.current_app_id.as_deref()
    }

    pub fn home_app_id(&self) -> Option<&str> {
        self.home_app_id.as_deref()
    }

    fn is_excluded(&self, app_id: &str) -> bool {
        app_id == self.self_app_id || self.home_app_id.as_deref() == Some(app_id)
    }

    /// Feed one raw observation. Returns the signal to emit, if any.
    pub fn observe(&mut self, app_id: &str, observed_at_ms: i64) -> Option<ForegroundSignal> {
        if self.is_excluded(app_id) {
            // Leaving a tracked app for home/self is reported once, without naming the app.
            self.current_app_id.take()?;
            self.last_change_at_ms = Some(observed_at_ms);
            return Some(ForegroundSignal::Departed { observed_at_ms });
        }

        if self.current_app_id.as_deref() == Some(app_id) {
            if let Some(last) = self.last_change_at_ms {
                if observed_at_ms.saturating_sub(last) < self.debounce_ms {
                    return None;
                }
            }
        }

        self.current_app_id = Some(app_id.to_string());
        self.last_change_at_ms = Some(observed_at_ms);
        Some(ForegroundSignal::Changed(ForegroundAppEvent {
            app_id: app_id.to_string(),
            observed_at_ms,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub self_app_id: String,
    /// When unset the source is asked to resolve the launcher.
    pub home_app_id: Option<String>,
    pub debounce: Duration,
}

impl WatcherSettings {
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            self_app_id: config.self_app_id.clone(),
            home_app_id: config.home_app_id.clone(),
            debounce: config.debounce(),
        }
    }
}

struct Shared {
    running: AtomicBool,
    callback: Mutex<Option<SignalCallback>>,
    current_app_id: Mutex<Option<String>>,
    home_app_id: Mutex<Option<String>>,
}

pub struct ForegroundWatcher {
    settings: WatcherSettings,
    strategy: WatchStrategy,
    status: Arc<EngineStatus>,
    shared: Arc<Shared>,
    source: Mutex<Option<Box<dyn ForegroundSource>>>,
    worker: Mutex<Option<JoinHandle<Box<dyn ForegroundSource>>>>,
}

impl ForegroundWatcher {
    pub fn new(source: Box<dyn ForegroundSource>, settings: WatcherSettings, status: Arc<EngineStatus>) -> Self {
        Self {
            settings,
            strategy: source.strategy(),
            status,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                callback: Mutex::new(None),
                current_app_id: Mutex::new(None),
                home_app_id: Mutex::new(None),
            }),
            source: Mutex::new(Some(source)),
            worker: Mutex::new(None),
        }
    }

    /// Register the single subscriber, replacing any previous one.
    pub fn on_foreground_changed<F>(&self, callback: F)
    where
        F: FnMut(ForegroundSignal) + Send + 'static,
    {
        *safe_lock(&self.shared.callback, "Watcher callback") = Some(Box::new(callback));
    }

    pub fn strategy(&self) -> WatchStrategy {
        self.strategy
    }

    pub fn current_app_id(&self) -> Option<String> {
        safe_lock(&self.shared.current_app_id, "Watcher state").clone()
    }

    /// The launcher id in effect for the last (or current) run.
    pub fn home_app_id(&self) -> Option<String> {
        safe_lock(&self.shared.home_app_id, "Watcher state").clone()
    }

    /// True while the worker thread is alive and has not gone inert.
    pub fn is_running(&self) -> bool {
        let worker = safe_lock(&self.worker, "Watcher worker");
        worker.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Start observing. Calling it while the worker is alive is a no-op; a
    /// worker that already exited is reaped and the source started again.
    pub fn start(&self) {
        if safe_lock(&self.worker, "Watcher worker").as_ref().is_some_and(JoinHandle::is_finished) {
            debug!("Reaping exited watcher worker before restart");
            self.join_worker();
        }

        let mut worker = safe_lock(&self.worker, "Watcher worker");
        if worker.is_some() {
            debug!("Watcher already started");
            return;
        }
        let Some(source) = safe_lock(&self.source, "Watcher source").take() else {
            warn!("Watcher has no foreground source to start with");
            return;
        };

        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let status = Arc::clone(&self.status);
        let settings = self.settings.clone();
        info!("Starting foreground watcher ({} strategy)", self.strategy);

        *worker = Some(thread::spawn(move || run_loop(source, &settings, &shared, &status)));
    }

    /// Stop observing and wait for the worker. The source is kept for a later `start`.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.join_worker();
        info!("Foreground watcher stopped");
    }

    /// Block until a finite source runs out. Native sources never do.
    pub fn wait(&self) {
        self.join_worker();
        self.shared.running.store(false, Ordering::SeqCst);
    }

    fn join_worker(&self) {
        let handle = safe_lock(&self.worker, "Watcher worker").take();
        let Some(handle) = handle else {
            return;
        };
        match handle.join() {
            Ok(source) => *safe_lock(&self.source, "Watcher source") = Some(source),
            Err(_) => warn!("Watcher thread panicked; the foreground source is lost"),
        }
    }
}

impl Drop for ForegroundWatcher {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.join_worker();
    }
}

fn run_loop(
    mut source: Box<dyn ForegroundSource>,
    settings: &WatcherSettings,
    shared: &Shared,
    status: &EngineStatus,
) -> Box<dyn ForegroundSource> {
    let home_app_id = settings.home_app_id.clone().or_else(|| source.resolve_home_app_id());
    match &home_app_id {
        Some(home) => debug!("Home app resolved to {home}"),
        None => debug!("No home app resolved; not filtering on it"),
    }
    *safe_lock(&shared.home_app_id, "Watcher state") = home_app_id.clone();

    let mut state = ForegroundAppState::new(settings.self_app_id.clone(), home_app_id, settings.debounce);
    let tick = Duration::from_millis(WATCHER_TICK_MS);

    while shared.running.load(Ordering::SeqCst) {
        let raw = match source.next_event(tick) {
            Ok(Some(raw)) => {
                status.clear_foreground_access_missing();
                raw
            }
            Ok(None) => continue,
            Err(SourceError::Transient(reason)) => {
                debug!("Foreground query failed, retrying: {reason}");
                thread::sleep(tick);
                continue;
            }
            Err(SourceError::Unavailable(reason)) => {
                status.flag_foreground_access_missing();
                warn!("Foreground source unavailable ({reason}); watcher is inert");
                break;
            }
            Err(SourceError::Exhausted) => {
                debug!("Foreground source exhausted");
                break;
            }
        };

        let Some(signal) = state.observe(&raw.app_id, raw.observed_at_ms) else {
            continue;
        };
        debug!("Foreground signal: {signal:?}");
        *safe_lock(&shared.current_app_id, "Watcher state") = state.current_app_id().map(String::from);

        if let Some(callback) = safe_lock(&shared.callback, "Watcher callback").as_mut() {
            callback(signal);
        }
    }

    source
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChannelSource, RawFocusEvent, UnavailableSource};
    use crate::test_utils::wait_for;
    use std::sync::mpsc;

    const SOCIAL: &str = "app.social";

    fn state() -> ForegroundAppState {
        ForegroundAppState::new("com.taichi_mochi", Some("com.android.launcher3".into()), Duration::from_millis(500))
    }

    fn changed_at(signal: Option<ForegroundSignal>) -> Option<i64> {
        match signal {
            Some(ForegroundSignal::Changed(event)) => Some(event.observed_at_ms),
            Some(ForegroundSignal::Departed { .. }) | None => None,
        }
    }

    #[test]
    fn test_debounce_example() {
        let mut state = state();
        let emitted: Vec<i64> = [0, 100, 600]
            .into_iter()
            .filter_map(|t| changed_at(state.observe(SOCIAL, t)))
            .collect();
        assert_eq!(emitted, vec![0, 600]);
    }

    #[test]
    fn test_burst_inside_window_emits_once() {
        let mut state = state();
        let emitted = [0, 50, 120, 300, 499]
            .into_iter()
            .filter_map(|t| changed_at(state.observe(SOCIAL, t)))
            .count();
        assert_eq!(emitted, 1);
    }

    #[test]
    fn test_spaced_events_each_emit() {
        let mut state = state();
        let emitted = [0, 500, 1_000, 2_000]
            .into_iter()
            .filter_map(|t| changed_at(state.observe(SOCIAL, t)))
            .count();
        assert_eq!(emitted, 4);
    }

    #[test]
    fn test_different_app_is_never_debounced() {
        let mut state = state();
        assert!(state.observe("app.a", 0).is_some());
        assert!(state.observe("app.b", 10).is_some());
        assert!(state.observe("app.a", 20).is_some());
        assert_eq!(state.current_app_id(), Some("app.a"));
    }

    #[test]
    fn test_home_and_self_never_emit_changed() {
        let mut state = state();
        for t in [0, 1_000, 5_000] {
            assert_eq!(changed_at(state.observe("com.android.launcher3", t)), None);
            assert_eq!(changed_at(state.observe("com.taichi_mochi", t + 1)), None);
        }
        assert_eq!(state.current_app_id(), None);
    }

    #[test]
    fn test_departed_emitted_once_when_leaving_tracked_app() {
        let mut state = state();
        state.observe(SOCIAL, 0);

        assert_eq!(
            state.observe("com.android.launcher3", 700),
            Some(ForegroundSignal::Departed { observed_at_ms: 700 })
        );
        assert_eq!(state.observe("com.taichi_mochi", 800), None);
        assert_eq!(state.current_app_id(), None);

        // Coming back right away is a fresh change, not a duplicate.
        assert_eq!(changed_at(state.observe(SOCIAL, 850)), Some(850));
    }

    #[test]
    fn test_unresolved_home_is_not_filtered() {
        let mut state = ForegroundAppState::new("com.taichi_mochi", None, Duration::from_millis(500));
        assert!(changed_at(state.observe("com.android.launcher3", 0)).is_some());
    }

    fn settings(home: Option<&str>) -> WatcherSettings {
        WatcherSettings {
            self_app_id: "com.taichi_mochi".into(),
            home_app_id: home.map(String::from),
            debounce: Duration::from_millis(500),
        }
    }

    fn scripted_watcher(home: Option<&str>) -> (mpsc::Sender<RawFocusEvent>, ForegroundWatcher, mpsc::Receiver<ForegroundSignal>) {
        let (events, source) = ChannelSource::new(Some("launcher".into()));
        let watcher = ForegroundWatcher::new(Box::new(source), settings(home), Arc::new(EngineStatus::new()));
        let (tx, rx) = mpsc::channel();
        watcher.on_foreground_changed(move |signal| {
            let _ = tx.send(signal);
        });
        (events, watcher, rx)
    }

    #[test]
    fn test_watcher_delivers_filtered_signals() {
        let (events, watcher, rx) = scripted_watcher(None);
        watcher.start();

        events.send(RawFocusEvent::new(SOCIAL, 0)).unwrap();
        events.send(RawFocusEvent::new(SOCIAL, 100)).unwrap();
        events.send(RawFocusEvent::new("launcher", 200)).unwrap();
        drop(events);
        watcher.wait();

        let signals: Vec<_> = rx.try_iter().collect();
        assert_eq!(signals.len(), 2);
        assert!(matches!(signals.first(), Some(ForegroundSignal::Changed(e)) if e.app_id == SOCIAL));
        assert_eq!(signals.get(1), Some(&ForegroundSignal::Departed { observed_at_ms: 200 }));
        assert_eq!(watcher.home_app_id(), Some("launcher".into()));
        assert_eq!(watcher.current_app_id(), None);
    }

    #[test]
    fn test_configured_home_overrides_resolved_one() {
        let (events, watcher, rx) = scripted_watcher(Some("custom.home"));
        watcher.start();
        events.send(RawFocusEvent::new("launcher", 0)).unwrap();
        events.send(RawFocusEvent::new("custom.home", 1_000)).unwrap();
        drop(events);
        watcher.wait();

        let signals: Vec<_> = rx.try_iter().collect();
        assert!(matches!(signals.first(), Some(ForegroundSignal::Changed(e)) if e.app_id == "launcher"));
        assert!(matches!(signals.get(1), Some(ForegroundSignal::Departed { .. })));
    }

    #[test]
    fn test_start_is_idempotent_and_stop_allows_restart() {
        let (events, watcher, rx) = scripted_watcher(None);
        watcher.start();
        watcher.start();
        assert!(watcher.is_running());
        assert_eq!(watcher.strategy(), WatchStrategy::Scripted);

        events.send(RawFocusEvent::new("app.a", 0)).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

        watcher.stop();
        assert!(!watcher.is_running());

        watcher.start();
        events.send(RawFocusEvent::new("app.b", 1_000)).unwrap();
        let signal = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(signal, ForegroundSignal::Changed(e) if e.app_id == "app.b"));
        watcher.stop();
    }

    #[test]
    fn test_unavailable_source_goes_inert_and_flags_once() {
        let status = Arc::new(EngineStatus::new());
        let watcher = ForegroundWatcher::new(
            Box::new(UnavailableSource::new("no display")),
            settings(None),
            Arc::clone(&status),
        );
        watcher.start();
        watcher.wait();

        assert!(!watcher.is_running());
        assert!(status.snapshot().foreground_access_missing);
        assert_eq!(watcher.strategy(), WatchStrategy::Inert);
    }

    /// Fails its first read with `first_error`, then serves `events`.
    struct FailsOnceSource {
        first_error: Option<SourceError>,
        events: mpsc::Receiver<RawFocusEvent>,
    }

    impl ForegroundSource for FailsOnceSource {
        fn strategy(&self) -> WatchStrategy {
            WatchStrategy::Scripted
        }

        fn next_event(&mut self, timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError> {
            if let Some(error) = self.first_error.take() {
                return Err(error);
            }
            Ok(self.events.recv_timeout(timeout).ok())
        }
    }

    fn fails_once_watcher(
        error: SourceError,
        status: &Arc<EngineStatus>,
    ) -> (mpsc::Sender<RawFocusEvent>, ForegroundWatcher, mpsc::Receiver<ForegroundSignal>) {
        let (events, receiver) = mpsc::channel();
        let source = FailsOnceSource { first_error: Some(error), events: receiver };
        let watcher = ForegroundWatcher::new(Box::new(source), settings(None), Arc::clone(status));
        let (tx, rx) = mpsc::channel();
        watcher.on_foreground_changed(move |signal| {
            let _ = tx.send(signal);
        });
        (events, watcher, rx)
    }

    #[test]
    fn test_start_after_worker_exit_restarts_source() {
        let status = Arc::new(EngineStatus::new());
        let (events, watcher, rx) = fails_once_watcher(SourceError::Exhausted, &status);

        watcher.start();
        wait_for(|| !watcher.is_running());

        watcher.start();
        assert!(watcher.is_running());
        events.send(RawFocusEvent::new(SOCIAL, 0)).unwrap();
        let signal = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(signal, ForegroundSignal::Changed(e) if e.app_id == SOCIAL));
        watcher.stop();
    }

    #[test]
    fn test_access_flag_clears_once_events_flow_again() {
        let status = Arc::new(EngineStatus::new());
        let (events, watcher, rx) =
            fails_once_watcher(SourceError::Unavailable("revoked".into()), &status);

        watcher.start();
        wait_for(|| !watcher.is_running());
        assert!(status.snapshot().foreground_access_missing);

        watcher.start();
        events.send(RawFocusEvent::new(SOCIAL, 0)).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
        assert!(!status.snapshot().foreground_access_missing);
        watcher.stop();
    }
}
