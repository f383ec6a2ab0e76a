// ABOUTME: SQLite database management: connection pool, schema migration and row helpers
// ABOUTME: Owns the accounts, gyms and affiliations tables and their UNIQUE constraints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Database Management
//!
//! One `SQLite` pool shared by three table managers. Identifiers are stored as
//! UUID strings and timestamps as RFC 3339 text. Uniqueness rules the workflow
//! depends on (one affiliation per account, one gym per owner, unique emails,
//! usernames and referral codes) are UNIQUE indexes, so concurrent writers
//! cannot both succeed.

mod accounts;
mod affiliations;
mod gyms;

/// Repository traits and their `SQLite` implementations
pub mod repositories;

pub use accounts::AccountManager;
pub use affiliations::AffiliationManager;
pub use gyms::GymManager;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::errors::DatabaseError;

/// Database manager for account, gym and affiliation storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the configured database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the schema migration fails
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let options = SqliteConnectOptions::from_str(&config.url.to_connection_string())
            .map_err(|e| DatabaseError::ConnectionError {
                context: format!("Invalid database URL {}: {e}", config.url),
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to :memory: opens a separate database, so keep exactly one alive
        let pool_options = if config.url.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionError {
                context: format!("Failed to open {}: {e}", config.url),
            })?;

        let db = Self { pool };
        db.migrate().await?;
        info!(database = %config.url, "Database ready");
        Ok(db)
    }

    /// Fresh in-memory database with the schema applied
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` cannot be opened
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Account table operations
    #[must_use]
    pub fn accounts(&self) -> AccountManager {
        AccountManager::new(self.pool.clone())
    }

    /// Gym table operations
    #[must_use]
    pub fn gyms(&self) -> GymManager {
        GymManager::new(self.pool.clone())
    }

    /// Affiliation table operations
    #[must_use]
    pub fn affiliations(&self) -> AffiliationManager {
        AffiliationManager::new(self.pool.clone())
    }

    /// Round-trip a trivial query
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can serve the query
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(DatabaseError::from)
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError {
                    context: e.to_string(),
                })?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        username TEXT,
        display_name TEXT NOT NULL,
        role TEXT NOT NULL CHECK (role IN ('member', 'gym_owner')),
        verified INTEGER NOT NULL DEFAULT 0,
        password_hash TEXT,
        bio TEXT,
        location TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_username ON accounts(username COLLATE NOCASE)",
    r"
    CREATE TABLE IF NOT EXISTS gyms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        address TEXT NOT NULL,
        referral_code TEXT NOT NULL,
        owner_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_gyms_owner ON gyms(owner_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_gyms_referral_code ON gyms(referral_code)",
    r"
    CREATE TABLE IF NOT EXISTS affiliations (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        belongs_to TEXT NOT NULL REFERENCES gyms(id) ON DELETE CASCADE,
        verified INTEGER NOT NULL DEFAULT 0,
        invite_type TEXT NOT NULL CHECK (invite_type IN ('existing', 'new', 'referral')),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_affiliations_user ON affiliations(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_affiliations_gym ON affiliations(belongs_to)",
];

// ============================================================================
// Row decoding helpers
// ============================================================================

pub(crate) fn uuid_column(row: &SqliteRow, column: &'static str) -> Result<Uuid, DatabaseError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| DatabaseError::InvalidData {
        column,
        reason: e.to_string(),
    })
}

pub(crate) fn timestamp_column(
    row: &SqliteRow,
    column: &'static str,
) -> Result<DateTime<Utc>, DatabaseError> {
    let raw: String = row.try_get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidData {
            column,
            reason: e.to_string(),
        })
}

pub(crate) fn parsed_column<T>(row: &SqliteRow, column: &'static str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: ToString,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: T::Err| DatabaseError::InvalidData {
        column,
        reason: e.to_string(),
    })
}
