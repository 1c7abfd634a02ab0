//! Error types for genji-ranks

use thiserror::Error;

use crate::membership::MembershipError;

/// Main error type for the ranking and submission core
#[derive(Error, Debug)]
pub enum Error {
    /// Storage, validation and configuration errors from genji-common
    #[error(transparent)]
    Common(#[from] genji_common::Error),

    /// Membership system failure on a must-propagate path (role delta, grant fetch)
    #[error("Membership error: {0}")]
    Membership(#[from] MembershipError),
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Common(genji_common::Error::Database(err))
    }
}

impl Error {
    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Common(genji_common::Error::InvalidInput(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Error::Common(genji_common::Error::NotFound(message.into()))
    }
}

/// Convenience Result type using the genji-ranks Error
pub type Result<T> = std::result::Result<T, Error>;
