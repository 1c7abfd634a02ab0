//! Common error types for Genji

use thiserror::Error;

/// Common result type for Genji operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the storage, configuration and domain layers
#[derive(Error, Debug)]
pub enum Error {
    /// Storage engine failure. Never swallowed by callers.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Bootstrap configuration is structurally invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested player, map or rating does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied a value that fails validation (never retried)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write collided with an existing row (duplicate map code, ...)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl Error {
    /// Reclassify unique/primary-key violations as [`Error::Conflict`]
    ///
    /// All other errors pass through untouched.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Error::Conflict(format!("{} already exists", what))
            }
            _ => Error::Database(err),
        }
    }
}
