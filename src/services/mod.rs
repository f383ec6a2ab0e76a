// ABOUTME: Domain service layer holding the business rules behind the HTTP routes
// ABOUTME: Affiliation lifecycle plus registration, login and profile editing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! Domain service layer
//!
//! Services receive their stores through constructor injection and know
//! nothing about HTTP, so tests can drive them with in-memory databases or
//! failing doubles.

/// Gym/account affiliation workflow
pub mod affiliation;

/// Registration, login and profile editing
pub mod registration;

pub use affiliation::{
    AffiliationService, NewAccountInvite, VerifyError, VerifyInviteRequest, VerifyStage,
};
pub use registration::{ProfileUpdate, Registration, RegistrationForm, RegistrationService};
