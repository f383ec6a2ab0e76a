// ABOUTME: SQLite implementation of the GymRegistry trait
// ABOUTME: Delegates to GymManager on the shared pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use async_trait::async_trait;
use uuid::Uuid;

use super::GymRegistry;
use crate::database::{Database, GymManager};
use crate::errors::DatabaseError;
use crate::models::{Gym, ReferralCode};

/// `SQLite` implementation of `GymRegistry`
pub struct GymRegistryImpl {
    gyms: GymManager,
}

impl GymRegistryImpl {
    /// Create a new `GymRegistry` with the given database connection
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self { gyms: db.gyms() }
    }
}

#[async_trait]
impl GymRegistry for GymRegistryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.gyms.get_by_id(id).await
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.gyms.get_by_owner(owner_id).await
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Gym>, DatabaseError> {
        self.gyms.get_by_referral_code(code).await
    }

    async fn create(&self, gym: &Gym) -> Result<Uuid, DatabaseError> {
        self.gyms.create(gym).await
    }
}
