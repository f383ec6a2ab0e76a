// ABOUTME: Account table operations: creation, lookups and credential/profile updates
// ABOUTME: Emails are stored lowercase; usernames compare case-insensitively
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parsed_column, timestamp_column, uuid_column};
use crate::errors::DatabaseError;
use crate::models::Account;

const ACCOUNT_COLUMNS: &str = "id, email, username, display_name, role, verified, password_hash, \
                               bio, location, created_at, updated_at";

/// Account database operations manager
pub struct AccountManager {
    pool: SqlitePool,
}

impl AccountManager {
    /// Create a new account manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an account
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` when the email or username is taken
    pub async fn create(&self, account: &Account) -> Result<Uuid, DatabaseError> {
        sqlx::query(
            r"
            INSERT INTO accounts (id, email, username, display_name, role, verified,
                                  password_hash, bio, location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(account.id.to_string())
        .bind(account.email.to_lowercase())
        .bind(account.username.as_deref())
        .bind(&account.display_name)
        .bind(account.role.as_str())
        .bind(account.verified)
        .bind(account.password_hash.as_deref())
        .bind(account.bio.as_deref())
        .bind(account.location.as_deref())
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(account.id)
    }

    /// Get an account by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    /// Get an account by email, ignoring case
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    /// Get an account by username, ignoring case
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1 COLLATE NOCASE"
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_account).transpose()
    }

    /// Whether any account uses this email
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email.trim().to_lowercase())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Set the username
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` when another account holds the username, or
    /// `NotFound` when the account is missing
    pub async fn update_username(&self, id: Uuid, username: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE accounts SET username = $1, updated_at = $2 WHERE id = $3")
            .bind(username)
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        require_row(result.rows_affected(), id)
    }

    /// Replace the password hash
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the account is missing
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = $1, updated_at = $2 WHERE id = $3")
                .bind(password_hash)
                .bind(Utc::now().to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;
        require_row(result.rows_affected(), id)
    }

    /// Mark registration as complete
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the account is missing
    pub async fn mark_verified(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE accounts SET verified = 1, updated_at = $1 WHERE id = $2")
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        require_row(result.rows_affected(), id)
    }

    /// Replace the editable profile fields
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the account is missing
    pub async fn update_profile(
        &self,
        id: Uuid,
        display_name: &str,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r"
            UPDATE accounts
            SET display_name = $1, bio = $2, location = $3, updated_at = $4
            WHERE id = $5
            ",
        )
        .bind(display_name)
        .bind(bio)
        .bind(location)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        require_row(result.rows_affected(), id)
    }

    /// Delete an account
    ///
    /// Owned gyms and affiliations go with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an account only while it has not completed registration
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn delete_unverified(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND verified = 0")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn require_row(rows_affected: u64, id: Uuid) -> Result<(), DatabaseError> {
    if rows_affected == 0 {
        Err(DatabaseError::NotFound {
            entity: "Account",
            id: id.to_string(),
        })
    } else {
        Ok(())
    }
}

fn row_to_account(row: &SqliteRow) -> Result<Account, DatabaseError> {
    Ok(Account {
        id: uuid_column(row, "id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        role: parsed_column(row, "role")?,
        verified: row.try_get("verified")?,
        password_hash: row.try_get("password_hash")?,
        bio: row.try_get("bio")?,
        location: row.try_get("location")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
