pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS distracting_apps (
    id INTEGER PRIMARY KEY,
    app_id TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'other'
);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Set once the default rules have been written, so user deletions stick.
pub const DEFAULTS_SEEDED_KEY: &str = "default_rules_seeded";
