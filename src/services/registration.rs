// ABOUTME: Account registration, login and profile editing
// ABOUTME: Member vs gym-owner sign-up forms, referral code generation, and bcrypt-backed sessions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{AuthManager, Session};
use crate::constants::limits::{REFERRAL_CODE_LENGTH, REFERRAL_CODE_MAX_ATTEMPTS};
use crate::constants::messages;
use crate::database::repositories::{Directory, GymRegistry};
use crate::errors::{AppError, AppResult, DatabaseError, ErrorCode};
use crate::logging::AppLogger;
use crate::models::{Account, AccountRole, AccountSummary, Gym, ReferralCode};
use crate::validation::{self, FieldErrors};

/// Sign-up form, one shape per role
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RegistrationForm {
    /// Plain member account
    Member {
        /// Login email
        email: String,
        /// Public handle
        username: String,
        /// Name shown to others
        display_name: String,
        /// Password
        password: String,
    },
    /// Gym owner account plus its gym
    GymOwner {
        /// Login email
        email: String,
        /// Public handle
        username: String,
        /// Name shown to others
        display_name: String,
        /// Password
        password: String,
        /// Gym name
        gym_name: String,
        /// Gym address
        gym_address: String,
    },
}

impl RegistrationForm {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        match self {
            Self::Member {
                email,
                username,
                display_name,
                password,
            } => check_account_fields(&mut errors, email, username, display_name, password),
            Self::GymOwner {
                email,
                username,
                display_name,
                password,
                gym_name,
                gym_address,
            } => {
                check_account_fields(&mut errors, email, username, display_name, password);
                errors.check("gym_name", validation::check_gym_name(gym_name.trim()));
                errors.check(
                    "gym_address",
                    validation::check_gym_address(gym_address.trim()),
                );
            }
        }
        errors.into_result()
    }
}

fn check_account_fields(
    errors: &mut FieldErrors,
    email: &str,
    username: &str,
    display_name: &str,
    password: &str,
) {
    errors.check("email", validation::check_email(email));
    errors.check("username", validation::check_username(username));
    errors.check(
        "display_name",
        validation::check_display_name(display_name.trim()),
    );
    errors.check_password("password", password);
}

/// Profile edit body
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    /// New display name
    pub display_name: String,
    /// Free-text bio; blank clears it
    #[serde(default)]
    pub bio: Option<String>,
    /// Location; blank clears it
    #[serde(default)]
    pub location: Option<String>,
}

/// Outcome of a successful registration
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    /// The new account
    pub account: AccountSummary,
    /// The owner's gym, for gym-owner sign-ups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gym: Option<Gym>,
    /// Session for the new account
    pub session: Session,
}

fn account_conflict(error: &DatabaseError) -> AppError {
    let message = match error {
        DatabaseError::UniqueViolation { constraint } if constraint.contains("username") => {
            messages::USERNAME_TAKEN
        }
        _ => messages::EMAIL_TAKEN,
    };
    AppError::new(ErrorCode::ResourceAlreadyExists, message).with_title(messages::ACTION_DENIED)
}

fn random_referral_code() -> AppResult<ReferralCode> {
    let raw = Alphanumeric.sample_string(&mut rand::thread_rng(), REFERRAL_CODE_LENGTH);
    ReferralCode::parse(&raw)
}

/// Registration, login and profile operations
#[derive(Clone)]
pub struct RegistrationService {
    directory: Arc<dyn Directory>,
    gyms: Arc<dyn GymRegistry>,
    auth: Arc<AuthManager>,
}

impl RegistrationService {
    /// Create the service over its collaborators
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        gyms: Arc<dyn GymRegistry>,
        auth: Arc<AuthManager>,
    ) -> Self {
        Self {
            directory,
            gyms,
            auth,
        }
    }

    /// Register a member or a gym owner with its gym
    ///
    /// # Errors
    ///
    /// `InvalidInput` listing every broken field rule, `ResourceAlreadyExists`
    /// when the email or username is taken. A gym owner whose gym cannot be
    /// created is not kept.
    pub async fn register(&self, form: RegistrationForm) -> AppResult<Registration> {
        form.validate()?;

        let (email, username, display_name, password, role) = match &form {
            RegistrationForm::Member {
                email,
                username,
                display_name,
                password,
            } => (email, username, display_name, password, AccountRole::Member),
            RegistrationForm::GymOwner {
                email,
                username,
                display_name,
                password,
                ..
            } => (email, username, display_name, password, AccountRole::GymOwner),
        };
        let email = validation::normalize_email(email);

        if self.directory.exists_by_email(&email).await? {
            return Err(AppError::new(ErrorCode::ResourceAlreadyExists, messages::EMAIL_TAKEN)
                .with_title(messages::ACTION_DENIED));
        }
        if self.directory.find_by_username(username).await?.is_some() {
            return Err(
                AppError::new(ErrorCode::ResourceAlreadyExists, messages::USERNAME_TAKEN)
                    .with_title(messages::ACTION_DENIED),
            );
        }

        let hash = self.auth.hash_password(password).await?;
        let account = Account::registered(
            &email,
            username.clone(),
            display_name.trim().to_owned(),
            role,
            hash,
        );
        self.directory.create(&account).await.map_err(|e| {
            if e.is_unique_violation() {
                account_conflict(&e)
            } else {
                AppError::from(e)
            }
        })?;

        let gym = match form {
            RegistrationForm::GymOwner {
                gym_name,
                gym_address,
                ..
            } => match self
                .create_gym(account.id, gym_name.trim(), gym_address.trim())
                .await
            {
                Ok(gym) => Some(gym),
                Err(e) => {
                    if let Err(cleanup) = self.directory.delete(account.id).await {
                        warn!(
                            user_id = %account.id,
                            error = %cleanup,
                            "Failed to roll back gym owner account"
                        );
                    }
                    return Err(e);
                }
            },
            RegistrationForm::Member { .. } => None,
        };

        AppLogger::log_auth_event(&account.id.to_string(), "registered", true, Some(role.as_str()));
        let session = self.auth.create_session(&account)?;
        Ok(Registration {
            account: AccountSummary::from(&account),
            gym,
            session,
        })
    }

    /// Insert a gym, redrawing the referral code on collision
    async fn create_gym(&self, owner_id: Uuid, name: &str, address: &str) -> AppResult<Gym> {
        for attempt in 1..=REFERRAL_CODE_MAX_ATTEMPTS {
            let gym = Gym::new(
                name.to_owned(),
                address.to_owned(),
                random_referral_code()?,
                owner_id,
            );
            match self.gyms.create(&gym).await {
                Ok(_) => {
                    info!(gym_id = %gym.id, owner = %owner_id, "Gym registered");
                    return Ok(gym);
                }
                Err(DatabaseError::UniqueViolation { constraint })
                    if constraint.contains("referral_code") =>
                {
                    debug!(attempt, "Referral code collision, drawing another");
                }
                Err(e) if e.is_unique_violation() => {
                    return Err(AppError::conflict("This account already owns a gym.")
                        .with_title(messages::ACTION_DENIED));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(AppError::internal("Could not allocate a unique referral code")
            .with_title("An unexpected error occurred."))
    }

    /// Exchange credentials for a session
    ///
    /// # Errors
    ///
    /// `AuthInvalid` for unknown emails, unverified accounts and wrong passwords
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
        let invalid = || {
            AppError::auth_invalid(messages::INVALID_CREDENTIALS).with_title("Unauthorized")
        };
        let email = validation::normalize_email(email);

        let Some(account) = self.directory.find_by_email(&email).await? else {
            AppLogger::log_auth_event("unknown", "login", false, Some("unknown email"));
            return Err(invalid());
        };
        let Some(hash) = account.password_hash.as_deref().filter(|_| account.verified) else {
            AppLogger::log_auth_event(&account.id.to_string(), "login", false, Some("unverified"));
            return Err(invalid());
        };
        if !self.auth.verify_password(password, hash).await? {
            AppLogger::log_auth_event(&account.id.to_string(), "login", false, None);
            return Err(invalid());
        }

        AppLogger::log_auth_event(&account.id.to_string(), "login", true, None);
        self.auth.create_session(&account)
    }

    /// Replace display name, bio and location
    ///
    /// # Errors
    ///
    /// `InvalidInput` for broken field rules, `ResourceNotFound` if the
    /// account vanished
    pub async fn update_profile(
        &self,
        requester_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<Account> {
        let display_name = update.display_name.trim();
        let bio = update.bio.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let location = update
            .location
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut errors = FieldErrors::new();
        errors.check("display_name", validation::check_display_name(display_name));
        if let Some(bio) = bio {
            errors.check("bio", validation::check_bio(bio));
        }
        if let Some(location) = location {
            errors.check("location", validation::check_location(location));
        }
        errors.into_result()?;

        self.directory
            .update_profile(requester_id, display_name, bio, location)
            .await?;
        self.directory
            .find_by_id(requester_id)
            .await?
            .ok_or_else(|| AppError::not_found("Account"))
    }
}
