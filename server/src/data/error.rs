//! Unified error type for the data layer
//!
//! Wraps backend-specific errors so services above the store never see
//! `sqlx` types directly.

use thiserror::Error;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// Stored document could not be decoded
    #[error("Corrupt document {entity}/{id}: {reason}")]
    Corrupt {
        entity: String,
        id: String,
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Conflict error (e.g. duplicate id)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DataError {
    /// Create a migration failed error
    pub fn migration_failed(backend: &'static str, version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            backend,
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }
}

/// Convert from the SQLite backend error type
impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        match e {
            crate::data::sqlite::SqliteError::Database(e) => Self::Sqlite(e),
            crate::data::sqlite::SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                backend: "sqlite",
                version,
                name,
                error,
            },
            crate::data::sqlite::SqliteError::Corrupt { entity, id, reason } => {
                Self::Corrupt { entity, id, reason }
            }
            crate::data::sqlite::SqliteError::Io(e) => Self::Io(e),
            crate::data::sqlite::SqliteError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteError;

    #[test]
    fn test_migration_failed_error_display() {
        let err = DataError::migration_failed("sqlite", 2, "add_documents_index", "syntax error");
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_documents_index) failed on sqlite: syntax error"
        );
    }

    #[test]
    fn test_from_sqlite_error_keeps_variant() {
        let err: DataError = SqliteError::Conflict("members/abc already exists".into()).into();
        assert!(matches!(err, DataError::Conflict(_)));

        let err: DataError = SqliteError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, DataError::Sqlite(_)));
    }
}
