// ABOUTME: SQLite implementation of the AffiliationStore trait
// ABOUTME: Delegates to AffiliationManager on the shared pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use async_trait::async_trait;
use uuid::Uuid;

use super::AffiliationStore;
use crate::database::{AffiliationManager, Database};
use crate::errors::DatabaseError;
use crate::models::Affiliation;

/// `SQLite` implementation of `AffiliationStore`
pub struct AffiliationStoreImpl {
    affiliations: AffiliationManager,
}

impl AffiliationStoreImpl {
    /// Create a new `AffiliationStore` with the given database connection
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            affiliations: db.affiliations(),
        }
    }
}

#[async_trait]
impl AffiliationStore for AffiliationStoreImpl {
    async fn create(&self, affiliation: &Affiliation) -> Result<Uuid, DatabaseError> {
        self.affiliations.create(affiliation).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Affiliation>, DatabaseError> {
        self.affiliations.get(id).await
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        self.affiliations.list_by_user(user_id).await
    }

    async fn list_by_gym(&self, gym_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        self.affiliations.list_by_gym(gym_id).await
    }

    async fn mark_verified(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.affiliations.mark_verified(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.affiliations.delete(id).await
    }
}
