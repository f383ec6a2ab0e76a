// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Validation limits, token settings, and user-facing error texts for the Gymn platform
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! Constants grouped by domain.

/// API endpoints
pub mod endpoints {
    /// Health check endpoint
    pub const HEALTH_CHECK: &str = "/health";
    /// API base path
    pub const API_BASE: &str = "/api";
    /// Path of the page invited accounts land on, relative to the app base URL
    pub const VERIFY_INVITE_PAGE: &str = "/auth/verifyinvite";
}

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8080;
}

/// Field limits shared by forms
pub mod limits {
    /// Username length bounds
    pub const USERNAME_MIN_LENGTH: usize = 3;
    /// Username length bounds
    pub const USERNAME_MAX_LENGTH: usize = 30;
    /// Password length bounds
    pub const PASSWORD_MIN_LENGTH: usize = 6;
    /// Password length bounds
    pub const PASSWORD_MAX_LENGTH: usize = 40;
    /// Display name length bounds
    pub const DISPLAY_NAME_MIN_LENGTH: usize = 2;
    /// Display name length bounds
    pub const DISPLAY_NAME_MAX_LENGTH: usize = 25;
    /// Gym name and address length bounds
    pub const GYM_FIELD_MIN_LENGTH: usize = 2;
    /// Gym name and address length bounds
    pub const GYM_FIELD_MAX_LENGTH: usize = 30;
    /// Profile bio maximum characters
    pub const BIO_MAX_LENGTH: usize = 160;
    /// Profile bio maximum lines
    pub const BIO_MAX_LINES: usize = 4;
    /// Profile location maximum characters
    pub const LOCATION_MAX_LENGTH: usize = 30;
    /// Referral code length
    pub const REFERRAL_CODE_LENGTH: usize = 7;
    /// Attempts at drawing an unused referral code before giving up
    pub const REFERRAL_CODE_MAX_ATTEMPTS: usize = 8;
}

/// Accented Latin letters accepted in names and addresses
pub const ACCENTED_LETTERS: &str = "äëiöüÄËÏÖÜáéíóúÁÉÍÓÚãõñÃÕÑâêîôûÂÊÎÔÛ";

/// Session and token settings
pub mod auth {
    /// Cookie carrying the session token
    pub const SESSION_COOKIE_NAME: &str = "auth_token";
    /// JWT audience for every token this server mints
    pub const TOKEN_AUDIENCE: &str = "gymn-api";
    /// JWT issuer
    pub const TOKEN_ISSUER: &str = "gymn-server";
    /// Purpose claim of a login session
    pub const PURPOSE_SESSION: &str = "session";
    /// Purpose claim of a new-account invite
    pub const PURPOSE_INVITE: &str = "invite";
    /// Default session lifetime
    pub const DEFAULT_SESSION_EXPIRY_HOURS: i64 = 24;
    /// Default invite link lifetime
    pub const DEFAULT_INVITE_EXPIRY_HOURS: i64 = 72;
    /// Default bcrypt cost
    pub const DEFAULT_BCRYPT_COST: u32 = 12;
    /// Lowest cost bcrypt accepts
    pub const BCRYPT_MIN_COST: u32 = 4;
    /// Highest cost bcrypt accepts
    pub const BCRYPT_MAX_COST: u32 = 31;
    /// Minimum accepted length of a configured JWT secret
    pub const JWT_SECRET_MIN_LENGTH: usize = 32;
}

/// Titles and descriptions shown to users
pub mod messages {
    /// Generic denial title
    pub const ACTION_DENIED: &str = "Action denied";
    /// Requester is not a gym owner
    pub const NOT_GYM_OWNER: &str = "Only gym owners can manage affiliates.";
    /// Title when the target user does not exist
    pub const USER_NOT_FOUND_TITLE: &str = "User does not exist.";
    /// Description when the target user does not exist
    pub const USER_NOT_FOUND: &str = "The specified user does not exist.";
    /// Target is a gym owner
    pub const CANNOT_AFFILIATE_OWNER: &str = "You cannot affiliate a gym owner.";
    /// Target is already affiliated
    pub const ALREADY_AFFILIATED: &str = "The specified user is already affiliated with a gym.";
    /// Gym owner tried to join a gym
    pub const OWNERS_CANNOT_JOIN: &str = "Gym owners cannot join another gym.";
    /// Target is the requester
    pub const CANNOT_AFFILIATE_SELF: &str = "You cannot affiliate yourself.";
    /// Title when the gym does not exist
    pub const GYM_NOT_FOUND_TITLE: &str = "Gym does not exist.";
    /// Description when the gym does not exist
    pub const GYM_NOT_FOUND: &str = "No gym was found for this request.";
    /// Both or neither selector supplied
    pub const SELECTOR_EXCLUSIVE: &str = "Provide exactly one of email or username.";
    /// Email already registered
    pub const EMAIL_TAKEN: &str = "An account with this email already exists.";
    /// Username already registered
    pub const USERNAME_TAKEN: &str = "This username is already taken.";
    /// Affiliation does not exist
    pub const AFFILIATION_NOT_FOUND: &str = "Affiliation does not exist.";
    /// Invitation addressed to another account
    pub const NOT_YOUR_INVITATION: &str = "This invitation is not addressed to you.";
    /// Invitation no longer pending
    pub const INVITATION_NOT_PENDING: &str = "This invitation has already been answered.";
    /// Invitation removed before the invited account was completed
    pub const INVITATION_WITHDRAWN: &str = "This invitation is no longer available.";
    /// Requester does not own the affiliation's gym
    pub const NOT_YOUR_GYM: &str = "You can only remove affiliates of your own gym.";
    /// Invite token invalid
    pub const INVALID_INVITE_TOKEN: &str = "The invitation link is invalid or has expired.";
    /// Account already verified
    pub const ACCOUNT_ALREADY_VERIFIED: &str = "This account has already been verified.";
    /// Login failure
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";
    /// Generic failure description
    pub const TRY_AGAIN: &str = "Please try again in a moment.";
}
