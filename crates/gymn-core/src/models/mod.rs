// ABOUTME: Core data models for the Gymn affiliation platform
// ABOUTME: Re-exports Account, Gym, Affiliation and the enums describing their state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Data Models
//!
//! - `Account`: a user identity, either a member or a gym owner
//! - `Gym`: owned by exactly one gym-owner account, identified publicly by a `ReferralCode`
//! - `Affiliation`: the (possibly pending) link between one account and one gym

mod account;
mod affiliation;
mod gym;

pub use account::{Account, AccountRole, AccountSummary};
pub use affiliation::{
    AffiliateEntry, Affiliation, AffiliationState, Invitation, InviteSelector, InviteType,
};
pub use gym::{Gym, GymSummary, ReferralCode};
