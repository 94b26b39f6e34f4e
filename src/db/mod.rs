pub mod migrations;
pub mod schema;

use rusqlite::{Connection, Result};
use std::path::Path;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens the database and brings its schema up to date.
    pub fn open_migrated(path: &Path) -> Result<Self> {
        let db = Self::open(path)?;
        migrations::run(db.connection())?;
        Ok(db)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DistractingAppRule, DEFAULT_RULES};
    use tempfile::tempdir;

    #[test]
    fn test_database_opens() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let _db = Database::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations_create_rule_table() {
        let dir = tempdir().unwrap();
        let db = Database::open_migrated(&dir.path().join("test.db")).unwrap();

        let count: i32 = db.connection()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='distracting_apps'",
                [],
                |row| row.get(0)
            ).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_default_rules_seeded() {
        let dir = tempdir().unwrap();
        let db = Database::open_migrated(&dir.path().join("test.db")).unwrap();

        let count: i64 = db.connection()
            .query_row("SELECT COUNT(*) FROM distracting_apps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(usize::try_from(count).unwrap(), DEFAULT_RULES.len());

        let instagram_social: i32 = db.connection()
            .query_row(
                "SELECT COUNT(*) FROM distracting_apps
                 WHERE app_id = 'com.instagram.android' AND category = 'social'",
                [],
                |row| row.get(0)
            ).unwrap();
        assert_eq!(instagram_social, 1, "Instagram should be seeded as social");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();

        migrations::run(db.connection()).unwrap();
        migrations::run(db.connection()).unwrap();

        let count: i64 = db.connection()
            .query_row("SELECT COUNT(*) FROM distracting_apps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(usize::try_from(count).unwrap(), DEFAULT_RULES.len(), "Running migrations twice should not duplicate rules");
    }

    #[test]
    fn test_deleted_default_stays_deleted_after_rerun() {
        let dir = tempdir().unwrap();
        let db = Database::open_migrated(&dir.path().join("test.db")).unwrap();
        let conn = db.connection();

        DistractingAppRule::delete(conn, "com.netflix.mediaclient").unwrap();
        migrations::run(conn).unwrap();

        assert!(DistractingAppRule::find_by_app_id(conn, "com.netflix.mediaclient").unwrap().is_none());
    }
}
