// ABOUTME: Repository traits the affiliation workflow depends on
// ABOUTME: Directory (accounts), GymRegistry (gyms) and AffiliationStore (affiliation rows)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Repository Pattern
//!
//! Services receive these traits through their constructors, so workflow
//! logic can run against the `SQLite` implementations below or against test
//! doubles that inject failures.

mod affiliation_repository;
mod directory_repository;
mod gym_repository;

pub use affiliation_repository::AffiliationStoreImpl;
pub use directory_repository::DirectoryImpl;
pub use gym_repository::GymRegistryImpl;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DatabaseError;
use crate::models::{Account, Affiliation, Gym, ReferralCode};

/// Account lookup and mutation
#[async_trait]
pub trait Directory: Send + Sync {
    /// Account by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;

    /// Account by email, ignoring case
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError>;

    /// Account by username, ignoring case
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError>;

    /// Whether an account uses this email
    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Insert an account
    async fn create(&self, account: &Account) -> Result<Uuid, DatabaseError>;

    /// Set the username
    async fn update_username(&self, id: Uuid, username: &str) -> Result<(), DatabaseError>;

    /// Replace the password hash
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DatabaseError>;

    /// Mark registration complete
    async fn mark_verified(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Delete; `false` when no row matched
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Delete only an account that never completed registration
    async fn delete_unverified(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Replace display name, bio and location
    async fn update_profile(
        &self,
        id: Uuid,
        display_name: &str,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), DatabaseError>;
}

/// Gym lookup and registration
#[async_trait]
pub trait GymRegistry: Send + Sync {
    /// Gym by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Gym>, DatabaseError>;

    /// Gym owned by an account
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Gym>, DatabaseError>;

    /// Gym by referral code
    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Gym>, DatabaseError>;

    /// Insert a gym
    async fn create(&self, gym: &Gym) -> Result<Uuid, DatabaseError>;
}

/// Affiliation row storage
#[async_trait]
pub trait AffiliationStore: Send + Sync {
    /// Insert; a second row for the same account is a `UniqueViolation`
    async fn create(&self, affiliation: &Affiliation) -> Result<Uuid, DatabaseError>;

    /// Row by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Affiliation>, DatabaseError>;

    /// Rows held by an account
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError>;

    /// Rows of a gym
    async fn list_by_gym(&self, gym_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError>;

    /// Pending to active; `false` when no pending row matched
    async fn mark_verified(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Delete; `false` when no row matched
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;
}
