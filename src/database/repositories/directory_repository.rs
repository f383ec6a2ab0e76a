// ABOUTME: SQLite implementation of the Directory trait
// ABOUTME: Delegates to AccountManager on the shared pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use async_trait::async_trait;
use uuid::Uuid;

use super::Directory;
use crate::database::{AccountManager, Database};
use crate::errors::DatabaseError;
use crate::models::Account;

/// `SQLite` implementation of `Directory`
pub struct DirectoryImpl {
    accounts: AccountManager,
}

impl DirectoryImpl {
    /// Create a new `Directory` with the given database connection
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            accounts: db.accounts(),
        }
    }
}

#[async_trait]
impl Directory for DirectoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        self.accounts.get_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        self.accounts.get_by_email(email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        self.accounts.get_by_username(username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError> {
        self.accounts.email_exists(email).await
    }

    async fn create(&self, account: &Account) -> Result<Uuid, DatabaseError> {
        self.accounts.create(account).await
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<(), DatabaseError> {
        self.accounts.update_username(id, username).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        self.accounts.update_password(id, password_hash).await
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.accounts.mark_verified(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.accounts.delete(id).await
    }

    async fn delete_unverified(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.accounts.delete_unverified(id).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        display_name: &str,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.accounts
            .update_profile(id, display_name, bio, location)
            .await
    }
}
