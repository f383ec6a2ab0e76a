// ABOUTME: Affiliation table operations: insert, lookup, listing, verification and deletion
// ABOUTME: The UNIQUE index on user_id keeps every account to at most one affiliation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{parsed_column, timestamp_column, uuid_column};
use crate::errors::DatabaseError;
use crate::models::Affiliation;

const AFFILIATION_COLUMNS: &str =
    "id, user_id, belongs_to, verified, invite_type, created_at, updated_at";

/// Affiliation database operations manager
pub struct AffiliationManager {
    pool: SqlitePool,
}

impl AffiliationManager {
    /// Create a new affiliation manager
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an affiliation
    ///
    /// # Errors
    ///
    /// Returns `UniqueViolation` when the account already has an affiliation
    pub async fn create(&self, affiliation: &Affiliation) -> Result<Uuid, DatabaseError> {
        sqlx::query(
            r"
            INSERT INTO affiliations (id, user_id, belongs_to, verified, invite_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(affiliation.id.to_string())
        .bind(affiliation.user_id.to_string())
        .bind(affiliation.belongs_to.to_string())
        .bind(affiliation.verified)
        .bind(affiliation.invite_type.as_str())
        .bind(affiliation.created_at.to_rfc3339())
        .bind(affiliation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(affiliation.id)
    }

    /// Get an affiliation by ID
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get(&self, id: Uuid) -> Result<Option<Affiliation>, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT {AFFILIATION_COLUMNS} FROM affiliations WHERE id = $1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_affiliation).transpose()
    }

    /// Affiliations held by an account (zero or one)
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {AFFILIATION_COLUMNS} FROM affiliations WHERE user_id = $1"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_affiliation).collect()
    }

    /// Every affiliation of a gym, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_by_gym(&self, gym_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {AFFILIATION_COLUMNS} FROM affiliations WHERE belongs_to = $1 ORDER BY created_at DESC"
        ))
        .bind(gym_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_affiliation).collect()
    }

    /// Flip a pending affiliation to active
    ///
    /// Returns `false` when no pending row with this id exists, which lets two
    /// racing accepts resolve to exactly one winner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn mark_verified(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE affiliations SET verified = 1, updated_at = $1 WHERE id = $2 AND verified = 0",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an affiliation; returns whether a row was removed
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM affiliations WHERE id = $1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_affiliation(row: &SqliteRow) -> Result<Affiliation, DatabaseError> {
    Ok(Affiliation {
        id: uuid_column(row, "id")?,
        user_id: uuid_column(row, "user_id")?,
        belongs_to: uuid_column(row, "belongs_to")?,
        verified: row.try_get("verified")?,
        invite_type: parsed_column(row, "invite_type")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::{Account, AccountRole, Gym, InviteType, ReferralCode};

    async fn seed(db: &Database) -> (Uuid, Uuid) {
        let owner = Account::registered(
            "g@x.com",
            "gymowner".into(),
            "Owner".into(),
            AccountRole::GymOwner,
            "hash".into(),
        );
        let member = Account::registered(
            "m@x.com",
            "member".into(),
            "Member".into(),
            AccountRole::Member,
            "hash".into(),
        );
        db.accounts().create(&owner).await.unwrap();
        db.accounts().create(&member).await.unwrap();
        let gym = Gym::new(
            "Gym".into(),
            "Addr".into(),
            ReferralCode::parse("GYM0001").unwrap(),
            owner.id,
        );
        db.gyms().create(&gym).await.unwrap();
        (member.id, gym.id)
    }

    #[tokio::test]
    async fn test_second_affiliation_for_user_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let (member, gym) = seed(&db).await;
        let store = db.affiliations();

        store
            .create(&Affiliation::invite(member, gym, InviteType::Existing))
            .await
            .unwrap();
        let err = store
            .create(&Affiliation::invite(member, gym, InviteType::Existing))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(store.list_by_user(member).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_verified_only_once() {
        let db = Database::in_memory().await.unwrap();
        let (member, gym) = seed(&db).await;
        let store = db.affiliations();
        let affiliation = Affiliation::invite(member, gym, InviteType::Existing);
        store.create(&affiliation).await.unwrap();

        assert!(store.mark_verified(affiliation.id).await.unwrap());
        assert!(!store.mark_verified(affiliation.id).await.unwrap());
        assert!(store.get(affiliation.id).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_row_existed() {
        let db = Database::in_memory().await.unwrap();
        let (member, gym) = seed(&db).await;
        let store = db.affiliations();
        let affiliation = Affiliation::referral(member, gym);
        store.create(&affiliation).await.unwrap();

        assert_eq!(store.list_by_gym(gym).await.unwrap().len(), 1);
        assert!(store.delete(affiliation.id).await.unwrap());
        assert!(!store.delete(affiliation.id).await.unwrap());
        assert!(store.get(affiliation.id).await.unwrap().is_none());
    }
}
