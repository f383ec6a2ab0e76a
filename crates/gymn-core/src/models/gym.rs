// ABOUTME: Gym model and the referral code that identifies a gym publicly
// ABOUTME: ReferralCode is a validated newtype over seven uppercase alphanumerics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::limits::REFERRAL_CODE_LENGTH;
use crate::errors::AppError;

/// Human-shareable code for self-service joining
///
/// Always seven characters from `A-Z0-9`. Parsing uppercases the input first,
/// so `abc1234` and `ABC1234` name the same gym.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Normalise and validate a code
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` unless the code is seven ASCII letters or digits.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == REFERRAL_CODE_LENGTH && code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            Ok(Self(code))
        } else {
            Err(AppError::invalid_input(format!(
                "Referral code must be {REFERRAL_CODE_LENGTH} letters or digits"
            ))
            .with_title("Invalid referral code"))
        }
    }

    /// The normalised code
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ReferralCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl FromStr for ReferralCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReferralCode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferralCode> for String {
    fn from(code: ReferralCode) -> Self {
        code.0
    }
}

/// A gym, owned by exactly one gym-owner account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gym {
    /// Unique identifier
    pub id: Uuid,
    /// Gym name
    pub name: String,
    /// Street address
    pub address: String,
    /// Unique public code
    pub referral_code: ReferralCode,
    /// Owning account; immutable
    pub owner_id: Uuid,
    /// When the gym was registered
    pub created_at: DateTime<Utc>,
}

impl Gym {
    /// Create a gym for `owner_id`
    #[must_use]
    pub fn new(name: String, address: String, referral_code: ReferralCode, owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            address,
            referral_code,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a gym
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GymSummary {
    /// Gym id
    pub id: Uuid,
    /// Gym name
    pub name: String,
    /// Street address
    pub address: String,
}

impl From<&Gym> for GymSummary {
    fn from(gym: &Gym) -> Self {
        Self {
            id: gym.id,
            name: gym.name.clone(),
            address: gym.address.clone(),
        }
    }
}
