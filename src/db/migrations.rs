use super::schema::{DEFAULTS_SEEDED_KEY, SCHEMA};
use crate::models::DEFAULT_RULES;
use rusqlite::{params, Connection, OptionalExtension, Result};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_default_rules(conn)?;
    Ok(())
}

fn seed_default_rules(conn: &Connection) -> Result<()> {
    let seeded: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            [DEFAULTS_SEEDED_KEY],
            |row| row.get(0),
        )
        .optional()?;

    if seeded.is_some() {
        return Ok(());
    }

    for (app_id, display_name, category) in DEFAULT_RULES {
        conn.execute(
            "INSERT OR IGNORE INTO distracting_apps (app_id, display_name, category) VALUES (?1, ?2, ?3)",
            params![app_id, display_name, category.as_str()],
        )?;
    }
    conn.execute(
        "INSERT INTO meta (key, value) VALUES (?1, '1')",
        [DEFAULTS_SEEDED_KEY],
    )?;
    Ok(())
}
