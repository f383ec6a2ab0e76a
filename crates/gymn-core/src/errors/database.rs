// ABOUTME: Database-specific error types for storage operations
// ABOUTME: Maps unique-constraint violations to conflicts and everything else to internal failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use thiserror::Error;

use super::{AppError, ErrorCode};

/// Errors raised by the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A UNIQUE index rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Constraint or index name reported by the driver
        constraint: String,
    },

    /// Entity lookup came back empty where a row was required
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind
        entity: &'static str,
        /// Identifier used for the lookup
        id: String,
    },

    /// Could not open or acquire a connection
    #[error("Database connection failed: {context}")]
    ConnectionError {
        /// What was being attempted
        context: String,
    },

    /// Query execution failed
    #[error("Database query failed: {context}")]
    QueryError {
        /// Driver message
        context: String,
    },

    /// Schema creation failed
    #[error("Database migration failed: {context}")]
    MigrationError {
        /// Driver message
        context: String,
    },

    /// Stored data could not be decoded into a model
    #[error("Invalid data in column {column}: {reason}")]
    InvalidData {
        /// Column that failed to decode
        column: &'static str,
        /// Decode failure
        reason: String,
    },
}

impl DatabaseError {
    /// Whether this error came from a UNIQUE index
    #[must_use]
    pub const fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::UniqueViolation {
                    constraint: db_err
                        .constraint()
                        .map_or_else(|| db_err.message().to_owned(), ToOwned::to_owned),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::ConnectionError {
                    context: error.to_string(),
                }
            }
            sqlx::Error::ColumnDecode { index, source } => Self::InvalidData {
                column: "unknown",
                reason: format!("{index}: {source}"),
            },
            other => Self::QueryError {
                context: other.to_string(),
            },
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::UniqueViolation { .. } => {
                Self::new(ErrorCode::ResourceAlreadyExists, error.to_string())
                    .with_title("Action denied")
                    .with_source(error)
            }
            DatabaseError::NotFound { entity, .. } => {
                Self::new(ErrorCode::ResourceNotFound, error.to_string())
                    .with_title(format!("{entity} does not exist."))
            }
            DatabaseError::ConnectionError { .. }
            | DatabaseError::QueryError { .. }
            | DatabaseError::MigrationError { .. }
            | DatabaseError::InvalidData { .. } => {
                tracing::error!(error = %error, "Store call failed");
                Self::new(ErrorCode::InternalError, "Please try again in a moment.")
                    .with_title("An unexpected error occurred.")
                    .with_source(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let error: AppError = DatabaseError::UniqueViolation {
            constraint: "idx_affiliations_user".into(),
        }
        .into();
        assert_eq!(error.category(), ErrorCategory::Conflict);
        assert_eq!(error.http_status(), 409);
    }

    #[test]
    fn test_query_failure_maps_to_unknown_error_with_source() {
        let error: AppError = DatabaseError::QueryError {
            context: "disk I/O error".into(),
        }
        .into();
        assert_eq!(error.category(), ErrorCategory::UnknownError);
        assert_eq!(error.http_status(), 500);
        assert!(error.source.is_some());
        assert_eq!(error.message, "Please try again in a moment.");
    }

    #[test]
    fn test_not_found_title_names_entity() {
        let error: AppError = DatabaseError::NotFound {
            entity: "Gym",
            id: "abc".into(),
        }
        .into();
        assert_eq!(error.display_title(), "Gym does not exist.");
    }
}
