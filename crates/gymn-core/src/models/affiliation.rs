// ABOUTME: Affiliation model linking an account to a gym, pending or active
// ABOUTME: Invite types, derived lifecycle state, invite target selectors and listing views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountSummary, GymSummary};
use crate::constants::messages;
use crate::errors::AppError;
use crate::validation::{self, FieldErrors};

// ============================================================================
// Enums
// ============================================================================

/// How an affiliation came to be
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InviteType {
    /// Gym owner invited an account that already existed
    Existing,
    /// Gym owner invited someone who had no account yet
    New,
    /// Member joined with the gym's referral code
    Referral,
}

impl InviteType {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Existing => "existing",
            Self::New => "new",
            Self::Referral => "referral",
        }
    }
}

impl Display for InviteType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for InviteType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "existing" => Ok(Self::Existing),
            "new" => Ok(Self::New),
            "referral" => Ok(Self::Referral),
            _ => Err(AppError::invalid_input(format!("Invalid invite type: {s}"))),
        }
    }
}

/// Lifecycle state of a stored affiliation
///
/// Deleted affiliations have no row and therefore no state.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AffiliationState {
    /// Invitation in flight
    Pending,
    /// Active membership
    Active,
}

impl AffiliationState {
    /// State for a `verified` flag
    #[must_use]
    pub const fn from_verified(verified: bool) -> Self {
        if verified {
            Self::Active
        } else {
            Self::Pending
        }
    }
}

// ============================================================================
// Affiliation
// ============================================================================

/// Link between one account and one gym
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Affiliation {
    /// Unique identifier
    pub id: Uuid,
    /// The affiliate account
    pub user_id: Uuid,
    /// The gym
    pub belongs_to: Uuid,
    /// `false` while the invitation is pending
    pub verified: bool,
    /// Channel that created the row
    pub invite_type: InviteType,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the row last changed
    pub updated_at: DateTime<Utc>,
}

impl Affiliation {
    /// A pending invitation
    #[must_use]
    pub fn invite(user_id: Uuid, belongs_to: Uuid, invite_type: InviteType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            belongs_to,
            verified: false,
            invite_type,
            created_at: now,
            updated_at: now,
        }
    }

    /// An active membership created by a referral code
    #[must_use]
    pub fn referral(user_id: Uuid, belongs_to: Uuid) -> Self {
        Self {
            verified: true,
            ..Self::invite(user_id, belongs_to, InviteType::Referral)
        }
    }

    /// Derived lifecycle state
    #[must_use]
    pub const fn state(&self) -> AffiliationState {
        AffiliationState::from_verified(self.verified)
    }

    /// Whether the invitation is still awaiting an answer
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.verified
    }
}

// ============================================================================
// Invite target selector
// ============================================================================

/// Identifies the account an existing-user invite targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteSelector {
    /// Look the target up by email
    ByEmail(String),
    /// Look the target up by username
    ByUsername(String),
}

impl InviteSelector {
    /// Build a selector from a body carrying exactly one of `email` / `username`
    ///
    /// Blank strings count as absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when both or neither field is present, or when the
    /// supplied value is malformed.
    pub fn from_parts(email: Option<&str>, username: Option<&str>) -> Result<Self, AppError> {
        let email = email.map(str::trim).filter(|s| !s.is_empty());
        let username = username.map(str::trim).filter(|s| !s.is_empty());

        match (email, username) {
            (Some(email), None) => {
                let mut errors = FieldErrors::new();
                errors.check("email", validation::check_email(email));
                errors.into_result()?;
                Ok(Self::ByEmail(validation::normalize_email(email)))
            }
            (None, Some(username)) => {
                let mut errors = FieldErrors::new();
                errors.check("username", validation::check_username(username));
                errors.into_result()?;
                Ok(Self::ByUsername(username.to_owned()))
            }
            (Some(_), Some(_)) | (None, None) => {
                Err(AppError::invalid_input(messages::SELECTOR_EXCLUSIVE)
                    .with_title("Invalid request"))
            }
        }
    }
}

impl Display for InviteSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::ByEmail(email) => write!(f, "email:{email}"),
            Self::ByUsername(username) => write!(f, "username:{username}"),
        }
    }
}

// ============================================================================
// Listing views
// ============================================================================

/// One row of a gym's affiliate list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateEntry {
    /// Affiliation id
    pub id: Uuid,
    /// Pending or active
    pub state: AffiliationState,
    /// Channel that created the affiliation
    pub invite_type: InviteType,
    /// When the affiliation was created
    pub created_at: DateTime<Utc>,
    /// The affiliate
    pub user: AccountSummary,
}

/// A pending invitation as seen by the invited account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Affiliation id to accept or decline
    pub affiliation_id: Uuid,
    /// Channel that created the invitation
    pub invite_type: InviteType,
    /// When the invitation was sent
    pub created_at: DateTime<Utc>,
    /// The inviting gym
    pub gym: GymSummary,
}
