use crate::models::{default_rules, DistractingAppRule};
use log::debug;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Result of looking an app id up against the current rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_distracting: bool,
    pub rule: Option<DistractingAppRule>,
}

impl Classification {
    fn allowed() -> Self {
        Self { is_distracting: false, rule: None }
    }

    fn distracting(rule: &DistractingAppRule) -> Self {
        Self { is_distracting: true, rule: Some(rule.clone()) }
    }
}

/// Immutable view of the rules. Replaced wholesale, never edited in place.
#[derive(Debug, Default)]
struct RuleSnapshot {
    exact: HashMap<String, DistractingAppRule>,
    wildcard: Vec<DistractingAppRule>,
}

impl RuleSnapshot {
    fn build(rules: Vec<DistractingAppRule>) -> Self {
        let mut snapshot = Self::default();
        for rule in rules {
            if rule.app_id.contains('*') {
                snapshot.wildcard.push(rule);
            } else {
                snapshot.exact.insert(rule.app_id.to_lowercase(), rule);
            }
        }
        snapshot
    }

    fn lookup(&self, app_id: &str) -> Option<&DistractingAppRule> {
        let key = app_id.to_lowercase();
        self.exact.get(&key).or_else(|| {
            self.wildcard
                .iter()
                .find(|rule| pattern_matches(&rule.app_id, &key))
        })
    }

    fn len(&self) -> usize {
        self.exact.len() + self.wildcard.len()
    }
}

/// Glob match where `*` spans any run of characters, anchored at both ends.
fn pattern_matches(pattern: &str, text: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();
    let mut parts = pattern.split('*');

    let Some(rest) = parts.next().and_then(|first| text.strip_prefix(first)) else {
        return false;
    };
    let remaining: Vec<&str> = parts.collect();
    let Some((last, middle)) = remaining.split_last() else {
        return rest.is_empty();
    };

    let mut tail = rest;
    for part in middle.iter().filter(|p| !p.is_empty()) {
        match tail.find(part) {
            Some(found) => tail = tail.get(found + part.len()..).unwrap_or_default(),
            None => return false,
        }
    }
    tail.ends_with(last)
}

pub struct Classifier {
    snapshot: RwLock<Arc<RuleSnapshot>>,
}

impl Classifier {
    pub fn new(rules: Vec<DistractingAppRule>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RuleSnapshot::build(rules))),
        }
    }

    pub fn with_default_rules() -> Self {
        Self::new(default_rules())
    }

    pub fn from_db(conn: &Connection) -> rusqlite::Result<Self> {
        Ok(Self::new(DistractingAppRule::find_all(conn)?))
    }

    fn current(&self) -> Arc<RuleSnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Unknown app ids are never distracting.
    pub fn classify(&self, app_id: &str) -> Classification {
        let snapshot = self.current();
        snapshot
            .lookup(app_id)
            .map_or_else(Classification::allowed, Classification::distracting)
    }

    /// Swap in a new rule set. In-flight lookups finish on the old snapshot.
    pub fn set_rules(&self, rules: Vec<DistractingAppRule>) {
        let next = Arc::new(RuleSnapshot::build(rules));
        debug!("Classifier rule set replaced ({} rules)", next.len());
        let mut guard = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
        *guard = next;
    }

    pub fn reload(&self, conn: &Connection) -> rusqlite::Result<()> {
        self.set_rules(DistractingAppRule::find_all(conn)?);
        Ok(())
    }

    pub fn rules(&self) -> Vec<DistractingAppRule> {
        let snapshot = self.current();
        let mut rules: Vec<_> = snapshot
            .exact
            .values()
            .chain(snapshot.wildcard.iter())
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.app_id.cmp(&b.app_id));
        rules
    }
}
