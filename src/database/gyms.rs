// ABOUTME: Gym table operations: registration and lookup by id, owner or referral code
// ABOUTME: Owner and referral code are each backed by a UNIQUE index
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parsed_column, timestamp_column, uuid_column};
use crate::errors::DatabaseError;
use crate::models::{Gym, ReferralCode};

/// Gym database operations manager
pub struct GymManager {
    pool: SqlitePool,
}

impl GymManager {
    /// Create a new gym manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a gym
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` when the owner already has a gym or the code is taken
    pub async fn create(&self, gym: &Gym) -> Result<Uuid, DatabaseError> {
        sqlx::query(
            r"
            INSERT INTO gyms (id, name, address, referral_code, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(gym.id.to_string())
        .bind(&gym.name)
        .bind(&gym.address)
        .bind(gym.referral_code.as_str())
        .bind(gym.owner_id.to_string())
        .bind(gym.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(gym.id)
    }

    /// Get a gym by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.fetch_one_where("id", &id.to_string()).await
    }

    /// Get the gym owned by an account
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_owner(&self, owner_id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.fetch_one_where("owner_id", &owner_id.to_string()).await
    }

    /// Get a gym by its referral code
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Gym>, DatabaseError> {
        self.fetch_one_where("referral_code", code.as_str()).await
    }

    async fn fetch_one_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Gym>, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT id, name, address, referral_code, owner_id, created_at FROM gyms WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_gym).transpose()
    }
}

fn row_to_gym(row: &SqliteRow) -> Result<Gym, DatabaseError> {
    Ok(Gym {
        id: uuid_column(row, "id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        referral_code: parsed_column::<ReferralCode>(row, "referral_code")?,
        owner_id: uuid_column(row, "owner_id")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}
