use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppCategory {
    Social,
    Entertainment,
    Gaming,
    Other,
}

impl AppCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AppCategory::Social => "social",
            AppCategory::Entertainment => "entertainment",
            AppCategory::Gaming => "gaming",
            AppCategory::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "social" => Some(AppCategory::Social),
            "entertainment" => Some(AppCategory::Entertainment),
            "gaming" => Some(AppCategory::Gaming),
            "other" => Some(AppCategory::Other),
            _ => None,
        }
    }
}

/// Rule set shipped with a fresh install.
pub const DEFAULT_RULES: &[(&str, &str, AppCategory)] = &[
    ("com.instagram.android", "Instagram", AppCategory::Social),
    ("com.facebook.katana", "Facebook", AppCategory::Social),
    ("com.twitter.android", "Twitter", AppCategory::Social),
    ("com.google.android.youtube", "YouTube", AppCategory::Entertainment),
    ("com.netflix.mediaclient", "Netflix", AppCategory::Entertainment),
    ("com.spotify.music", "Spotify", AppCategory::Entertainment),
];

/// An app the user has declared distracting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistractingAppRule {
    pub app_id: String,
    pub display_name: String,
    pub category: AppCategory,
}

pub fn default_rules() -> Vec<DistractingAppRule> {
    DEFAULT_RULES
        .iter()
        .map(|(app_id, name, category)| DistractingAppRule::new(app_id, name, *category))
        .collect()
}

impl DistractingAppRule {
    pub fn new(app_id: &str, display_name: &str, category: AppCategory) -> Self {
        Self {
            app_id: app_id.to_string(),
            display_name: display_name.to_string(),
            category,
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        let category: String = row.get(2)?;
        Ok(Self {
            app_id: row.get(0)?,
            display_name: row.get(1)?,
            category: AppCategory::from_str(&category).unwrap_or(AppCategory::Other),
        })
    }

    pub fn find_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT app_id, display_name, category FROM distracting_apps ORDER BY app_id"
        )?;

        let rows = stmt.query_map([], Self::from_row)?;
        rows.collect()
    }

    pub fn find_by_app_id(conn: &Connection, app_id: &str) -> Result<Option<Self>> {
        conn.query_row(
            "SELECT app_id, display_name, category FROM distracting_apps WHERE app_id = ?1",
            [app_id],
            Self::from_row,
        )
        .optional()
    }

    pub fn create(conn: &Connection, rule: &DistractingAppRule) -> Result<()> {
        conn.execute(
            "INSERT INTO distracting_apps (app_id, display_name, category) VALUES (?1, ?2, ?3)",
            params![rule.app_id, rule.display_name, rule.category.as_str()],
        )?;
        Ok(())
    }

    /// Returns false when no rule existed for `app_id`.
    pub fn delete(conn: &Connection, app_id: &str) -> Result<bool> {
        let affected = conn.execute("DELETE FROM distracting_apps WHERE app_id = ?1", [app_id])?;
        Ok(affected > 0)
    }
}
