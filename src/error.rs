use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("'{name}' already exists")]
    AlreadyExists { name: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background service is not running")]
    NotRunning,

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Could not determine project directories")]
    NoProjectDirs,
}

/// Check if a rusqlite error is a UNIQUE constraint violation
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.code == rusqlite::ffi::ErrorCode::ConstraintViolation)
}
