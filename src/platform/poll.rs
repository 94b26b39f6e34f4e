use super::{ForegroundSource, FrontmostQuery, RawFocusEvent, SourceError, WatchStrategy};
use std::thread;
use std::time::{Duration, Instant};

/// Polls a [`FrontmostQuery`] on a fixed interval and reports only transitions.
pub struct PollingSource<Q> {
    query: Q,
    interval: Duration,
    next_poll_at: Option<Instant>,
    last_reported: Option<String>,
}

impl<Q: FrontmostQuery> PollingSource<Q> {
    pub fn new(query: Q, interval: Duration) -> Self {
        Self {
            query,
            interval,
            next_poll_at: None,
            last_reported: None,
        }
    }
}

impl<Q: FrontmostQuery> ForegroundSource for PollingSource<Q> {
    fn strategy(&self) -> WatchStrategy {
        WatchStrategy::Poll
    }

    fn resolve_home_app_id(&mut self) -> Option<String> {
        self.query.home_app_id()
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawFocusEvent>, SourceError> {
        if let Some(due) = self.next_poll_at {
            let now = Instant::now();
            if due > now {
                thread::sleep((due - now).min(timeout));
                if Instant::now() < due {
                    return Ok(None);
                }
            }
        }
        self.next_poll_at = Some(Instant::now() + self.interval);

        match self.query.frontmost_app_id()? {
            Some(app_id) if self.last_reported.as_deref() != Some(app_id.as_str()) => {
                self.last_reported = Some(app_id.clone());
                Ok(Some(RawFocusEvent::observed_now(app_id)))
            }
            Some(_) | None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct ScriptedQuery {
        answers: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl FrontmostQuery for ScriptedQuery {
        fn frontmost_app_id(&self) -> Result<Option<String>, SourceError> {
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                return Err(SourceError::Transient("no answer".into()));
            }
            Ok(answers.remove(0))
        }

        fn home_app_id(&self) -> Option<String> {
            Some("launcher".into())
        }
    }

    fn source(answers: Vec<Option<&str>>) -> PollingSource<ScriptedQuery> {
        let answers = answers.into_iter().map(|a| a.map(String::from)).collect();
        PollingSource::new(
            ScriptedQuery { answers: Arc::new(Mutex::new(answers)) },
            Duration::from_millis(1),
        )
    }

    fn next(source: &mut PollingSource<ScriptedQuery>) -> Option<String> {
        source
            .next_event(Duration::from_millis(50))
            .unwrap()
            .map(|e| e.app_id)
    }

    #[test]
    fn test_reports_only_transitions() {
        let mut source = source(vec![Some("a"), Some("a"), None, Some("b"), Some("a")]);

        assert_eq!(next(&mut source), Some("a".into()));
        assert_eq!(next(&mut source), None);
        assert_eq!(next(&mut source), None);
        assert_eq!(next(&mut source), Some("b".into()));
        assert_eq!(next(&mut source), Some("a".into()));
    }

    #[test]
    fn test_query_errors_propagate() {
        let mut source = source(vec![]);
        assert!(matches!(
            source.next_event(Duration::from_millis(5)),
            Err(SourceError::Transient(_))
        ));
    }

    #[test]
    fn test_home_comes_from_query() {
        let mut source = source(vec![]);
        assert_eq!(source.resolve_home_app_id(), Some("launcher".into()));
        assert_eq!(source.strategy(), WatchStrategy::Poll);
    }
}
