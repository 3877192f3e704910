//! Registrar database: connection bootstrap and schema migrations.
//!
//! # Responsibility
//! - Hand out connections that already carry the enrollment, attendance and
//!   grade tables, so stores can assume the schema exists.
//! - Keep one file database usable by many worker connections at once.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`; 1 adds sections and
//!   enrollments, 2 adds attendance and grades.
//! - A binary never opens a database migrated by a newer binary.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was migrated past what this binary knows how to read.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "registrar database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "registrar schema v{db_version} requires a newer binary (this one reads up to v{latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
