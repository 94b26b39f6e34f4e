use crate::classifier::Classifier;
use crate::error::{is_unique_violation, GuardError};
use crate::models::{AppCategory, DistractingAppRule};
use crate::validation::{validate_app_id, validate_display_name};
use log::info;
use rusqlite::Connection;

pub fn list_rules(conn: &Connection) -> Result<Vec<DistractingAppRule>, GuardError> {
    Ok(DistractingAppRule::find_all(conn)?)
}

/// Persist a new rule and swap it into the live classifier.
pub fn add_rule(
    conn: &Connection,
    classifier: &Classifier,
    app_id: &str,
    display_name: &str,
    category: &str,
) -> Result<DistractingAppRule, GuardError> {
    let app_id = validate_app_id(app_id)?;
    let display_name = validate_display_name(display_name)?;
    let category = AppCategory::from_str(category).ok_or_else(|| GuardError::InvalidInput {
        field: "category",
        reason: "must be 'social', 'entertainment', 'gaming', or 'other'".into(),
    })?;

    let rule = DistractingAppRule::new(app_id, display_name, category);
    DistractingAppRule::create(conn, &rule).map_err(|e| {
        if is_unique_violation(&e) {
            GuardError::AlreadyExists { name: rule.app_id.clone() }
        } else {
            GuardError::from(e)
        }
    })?;

    classifier.reload(conn)?;
    info!("Added rule for {} ({})", rule.app_id, rule.category.as_str());
    Ok(rule)
}

pub fn remove_rule(conn: &Connection, classifier: &Classifier, app_id: &str) -> Result<(), GuardError> {
    let app_id = validate_app_id(app_id)?;
    if !DistractingAppRule::delete(conn, app_id)? {
        return Err(GuardError::NotFound { entity: "Rule" });
    }
    classifier.reload(conn)?;
    info!("Removed rule for {app_id}");
    Ok(())
}
