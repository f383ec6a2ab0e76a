// ABOUTME: Account model with member and gym-owner roles
// ABOUTME: Covers registered accounts and the unverified placeholders created by invitations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Role an account plays on the platform
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Regular gym member
    #[default]
    Member,
    /// Owns exactly one gym
    GymOwner,
}

impl AccountRole {
    /// Database string representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::GymOwner => "gym_owner",
        }
    }
}

impl Display for AccountRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "gym_owner" => Ok(Self::GymOwner),
            _ => Err(AppError::invalid_input(format!("Invalid account role: {s}"))),
        }
    }
}

/// A user identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: Uuid,
    /// Unique, stored lowercase
    pub email: String,
    /// Unique case-insensitively; absent while an invited account is a placeholder
    pub username: Option<String>,
    /// Name shown to other users
    pub display_name: String,
    /// Member or gym owner
    pub role: AccountRole,
    /// Registration completed (password and username set)
    pub verified: bool,
    /// bcrypt hash; absent for placeholders
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Short profile text
    pub bio: Option<String>,
    /// Free-form location
    pub location: Option<String>,
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// When the account was last changed
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A fully registered, verified account
    #[must_use]
    pub fn registered(
        email: &str,
        username: String,
        display_name: String,
        role: AccountRole,
        password_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            username: Some(username),
            display_name,
            role,
            verified: true,
            password_hash: Some(password_hash),
            bio: None,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unverified member account created when a gym invites someone who has no account yet
    #[must_use]
    pub fn placeholder(email: &str, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            username: None,
            display_name,
            role: AccountRole::Member,
            verified: false,
            password_hash: None,
            bio: None,
            location: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this account owns a gym
    #[must_use]
    pub const fn is_gym_owner(&self) -> bool {
        matches!(self.role, AccountRole::GymOwner)
    }

    /// Whether two accounts share an email, ignoring case
    #[must_use]
    pub fn same_email(&self, other: &Self) -> bool {
        self.email.eq_ignore_ascii_case(&other.email)
    }
}

/// Public view of an account, safe to show to other users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountSummary {
    /// Account id
    pub id: Uuid,
    /// Username, if set
    pub username: Option<String>,
    /// Display name
    pub display_name: String,
    /// Email
    pub email: String,
    /// Role
    pub role: AccountRole,
    /// Whether registration is complete
    pub verified: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            email: account.email.clone(),
            role: account.role,
            verified: account.verified,
        }
    }
}
