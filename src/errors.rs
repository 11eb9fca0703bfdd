//! Unified error type for the ebook manager.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants follow the
//! failure classes a user can run into: validation problems caught before storage is
//! touched, uniqueness violations reported by the storage engine, and everything else
//! the storage layer or filesystem can throw at us.

use crate::entities::RecordKind;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All errors produced by the ebook manager.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// A required field (name, code, student ID, ...) was empty after trimming
    #[error("You need to fill out each entry field! ({kind} record is incomplete)")]
    IncompleteRecord {
        /// Kind of record that failed validation
        kind: RecordKind,
    },

    /// The grade is not one of the allowed values
    #[error("Invalid grade '{value}': expected one of 9, 10, 11, 12")]
    InvalidGrade {
        /// The rejected grade text
        value: String,
    },

    /// Another record already uses the identifier (found by the in-memory check)
    #[error("{} ('{value}')", .kind.already_exists_message())]
    AlreadyExists {
        /// Kind of record whose identifier collided
        kind: RecordKind,
        /// The colliding identifier
        value: String,
    },

    /// The storage engine rejected a write because of a UNIQUE constraint
    #[error("A record with that identifier already exists: {detail}")]
    ConstraintViolation {
        /// Constraint message reported by the database
        detail: String,
    },

    /// A record referenced by id does not exist (any more)
    #[error("{kind} record {id} not found")]
    RecordNotFound {
        /// Kind of the missing record
        kind: RecordKind,
        /// Storage id that was looked up
        id: i64,
    },

    /// No record carries the given Student ID or code
    #[error("No {kind} with {} '{value}'", .kind.identifier_label())]
    UnknownIdentifier {
        /// Kind of record looked up
        kind: RecordKind,
        /// The identifier that matched nothing
        value: String,
    },

    /// An edit operation was attempted with no record selected
    #[error("No {kind} record is selected")]
    NothingSelected {
        /// Kind of record the editor manages
        kind: RecordKind,
    },

    /// A storage operation was attempted without an open connection
    #[error("Not yet connected to a database")]
    NotConnected,

    /// Any other storage failure
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Filesystem failure (exports, reports, error logs, database files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::ConstraintViolation { detail },
            _ => Self::Database(err),
        }
    }
}

impl Error {
    /// Whether this error means "that identifier is already taken", regardless of
    /// whether the in-memory check or the storage constraint caught it.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists { .. } | Self::ConstraintViolation { .. }
        )
    }

    /// Whether this error is unexpected and deserves an error-log file.
    ///
    /// Validation failures are the user's to fix and are only shown, never logged to disk.
    #[must_use]
    pub const fn is_unexpected(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_) | Self::Config { .. })
    }

    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::IncompleteRecord { .. } => "You need to fill out each entry field!".to_string(),
            Self::AlreadyExists { kind, .. } => kind.already_exists_message().to_string(),
            Self::ConstraintViolation { .. } => {
                "A record with that identifier already exists!".to_string()
            }
            Self::Database(_) | Self::Io(_) => "An unknown error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
