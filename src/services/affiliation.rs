// ABOUTME: Affiliation lifecycle between gyms and accounts
// ABOUTME: Invites, new-account verification, accept/decline, removal, referral joins and listings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Affiliation workflow
//!
//! Every operation checks its preconditions in a fixed order and returns the
//! first failure without touching the stores. The at-most-one-row-per-account
//! rule is enforced by the store's UNIQUE index; a violation on insert is
//! reported as a conflict.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthManager, Session};
use crate::constants::endpoints::VERIFY_INVITE_PAGE;
use crate::constants::messages;
use crate::database::repositories::{AffiliationStore, Directory, GymRegistry};
use crate::errors::{AppError, AppResult, DatabaseError, ErrorCode};
use crate::logging::AppLogger;
use crate::models::{
    Account, AccountSummary, AffiliateEntry, Affiliation, Gym, GymSummary, InviteSelector,
    InviteType, Invitation, ReferralCode,
};
use crate::notifications::{spawn_dispatch, AffiliationEvent, NotificationDispatcher};
use crate::validation::{self, FieldErrors};

/// Body of a new-account verification
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyInviteRequest {
    /// Invite token from the link
    pub access_token: String,
    /// Email the invite was sent to
    pub email: String,
    /// Chosen username
    pub username: String,
    /// Chosen password
    pub password: String,
}

/// Where a verification failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    /// Signing in with the freshly set password failed
    SignIn,
    /// Setting username or verified flags failed
    ProfileUpdate,
    /// Input, token or password-set failure
    Validation,
}

impl VerifyStage {
    /// Numeric code reported to the client
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::SignIn => 1,
            Self::ProfileUpdate => 2,
            Self::Validation => 3,
        }
    }
}

/// Verification failure tagged with the stage it happened in
#[derive(Debug)]
pub struct VerifyError {
    /// Failing stage
    pub stage: VerifyStage,
    /// Underlying error
    pub error: AppError,
}

impl VerifyError {
    fn at(stage: VerifyStage) -> impl FnOnce(AppError) -> Self {
        move |error| Self { stage, error }
    }
}

impl Display for VerifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "verification failed (code {}): {}", self.stage.code(), self.error)
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of inviting a brand-new account
#[derive(Debug, Clone, serde::Serialize)]
pub struct NewAccountInvite {
    /// Pending row
    pub affiliation: Affiliation,
    /// Placeholder account
    pub account: AccountSummary,
}

fn action_denied(code: ErrorCode, message: &str) -> AppError {
    AppError::new(code, message).with_title(messages::ACTION_DENIED)
}

fn not_gym_owner() -> AppError {
    action_denied(ErrorCode::AuthInvalid, messages::NOT_GYM_OWNER)
}

fn gym_not_found() -> AppError {
    AppError::new(ErrorCode::ResourceNotFound, messages::GYM_NOT_FOUND)
        .with_title(messages::GYM_NOT_FOUND_TITLE)
}

fn affiliation_not_found(id: Uuid) -> AppError {
    AppError::new(ErrorCode::ResourceNotFound, messages::AFFILIATION_NOT_FOUND)
        .with_title(messages::AFFILIATION_NOT_FOUND)
        .with_resource_id(id.to_string())
}

fn already_affiliated() -> AppError {
    action_denied(ErrorCode::ResourceAlreadyExists, messages::ALREADY_AFFILIATED)
}

/// Map an insert failure, turning a UNIQUE violation into `conflict`
fn insert_failure(conflict: fn() -> AppError) -> impl Fn(DatabaseError) -> AppError {
    move |e| {
        if e.is_unique_violation() {
            conflict()
        } else {
            AppError::from(e)
        }
    }
}

/// Gym/account affiliation workflow
#[derive(Clone)]
pub struct AffiliationService {
    directory: Arc<dyn Directory>,
    gyms: Arc<dyn GymRegistry>,
    affiliations: Arc<dyn AffiliationStore>,
    auth: Arc<AuthManager>,
    notifier: Arc<dyn NotificationDispatcher>,
    app_base_url: String,
}

impl AffiliationService {
    /// Create the service over its collaborators
    #[must_use]
    pub fn new(
        directory: Arc<dyn Directory>,
        gyms: Arc<dyn GymRegistry>,
        affiliations: Arc<dyn AffiliationStore>,
        auth: Arc<AuthManager>,
        notifier: Arc<dyn NotificationDispatcher>,
        app_base_url: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            gyms,
            affiliations,
            auth,
            notifier,
            app_base_url: app_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    /// Load the account behind a session
    async fn requester(&self, id: Uuid) -> AppResult<Account> {
        self.directory.find_by_id(id).await?.ok_or_else(|| {
            AppError::auth_invalid("Session account no longer exists")
                .with_title("Unauthorized")
                .with_user_id(id)
        })
    }

    async fn owned_gym(&self, owner_id: Uuid) -> AppResult<Gym> {
        self.gyms
            .find_by_owner(owner_id)
            .await?
            .ok_or_else(gym_not_found)
    }

    async fn affiliation(&self, id: Uuid) -> AppResult<Affiliation> {
        self.affiliations
            .find_by_id(id)
            .await?
            .ok_or_else(|| affiliation_not_found(id))
    }

    fn invite_link(&self, token: &str, email: &str) -> String {
        format!(
            "{}{VERIFY_INVITE_PAGE}?token={}&email={}",
            self.app_base_url,
            urlencoding::encode(token),
            urlencoding::encode(email)
        )
    }

    /// Invite an existing account to the requester's gym
    ///
    /// # Errors
    ///
    /// In order: requester not a gym owner (`AuthInvalid`), target missing or
    /// still an invite placeholder (`ResourceNotFound`), target is a gym owner (`PermissionDenied`), target
    /// already affiliated (`ResourceAlreadyExists`), target is the requester
    /// (`PermissionDenied`), requester has no gym (`ResourceNotFound`)
    pub async fn invite_existing(
        &self,
        requester_id: Uuid,
        selector: &InviteSelector,
    ) -> AppResult<Affiliation> {
        let requester = self.requester(requester_id).await?;
        if !requester.is_gym_owner() {
            return Err(not_gym_owner());
        }

        let target = match selector {
            InviteSelector::ByEmail(email) => self.directory.find_by_email(email).await?,
            InviteSelector::ByUsername(username) => {
                self.directory.find_by_username(username).await?
            }
        }
        .filter(|account| account.verified)
        .ok_or_else(|| {
            AppError::new(ErrorCode::ResourceNotFound, messages::USER_NOT_FOUND)
                .with_title(messages::USER_NOT_FOUND_TITLE)
        })?;

        if target.is_gym_owner() {
            return Err(action_denied(
                ErrorCode::PermissionDenied,
                messages::CANNOT_AFFILIATE_OWNER,
            ));
        }
        if !self.affiliations.find_by_user(target.id).await?.is_empty() {
            return Err(already_affiliated());
        }
        if target.same_email(&requester) {
            return Err(action_denied(
                ErrorCode::PermissionDenied,
                messages::CANNOT_AFFILIATE_SELF,
            ));
        }
        let gym = self.owned_gym(requester.id).await?;

        let affiliation = Affiliation::invite(target.id, gym.id, InviteType::Existing);
        self.affiliations
            .create(&affiliation)
            .await
            .map_err(insert_failure(already_affiliated))?;

        info!(
            requester = %requester.id,
            target = %target.id,
            selector = %selector,
            affiliation_id = %affiliation.id,
            "Existing account invited"
        );
        spawn_dispatch(
            &self.notifier,
            AffiliationEvent::GymInvite {
                affiliation_id: affiliation.id,
                user_id: target.id,
                gym_id: gym.id,
                gym_name: gym.name,
            },
        );
        Ok(affiliation)
    }

    /// Create a placeholder account and a pending invite for it
    ///
    /// # Errors
    ///
    /// In order: requester not a gym owner (`AuthInvalid`), malformed display
    /// name or email (`InvalidInput`), email registered
    /// (`ResourceAlreadyExists`), requester has no gym (`ResourceNotFound`)
    pub async fn invite_new(
        &self,
        requester_id: Uuid,
        display_name: &str,
        email: &str,
    ) -> AppResult<NewAccountInvite> {
        let requester = self.requester(requester_id).await?;
        if !requester.is_gym_owner() {
            return Err(not_gym_owner());
        }

        let display_name = display_name.trim();
        let mut errors = FieldErrors::new();
        errors.check("display_name", validation::check_display_name(display_name));
        errors.check("email", validation::check_email(email));
        errors.into_result()?;
        let email = validation::normalize_email(email);

        let email_taken =
            || action_denied(ErrorCode::ResourceAlreadyExists, messages::EMAIL_TAKEN);
        if self.directory.exists_by_email(&email).await? {
            return Err(email_taken());
        }
        let gym = self.owned_gym(requester.id).await?;

        let account = Account::placeholder(&email, display_name.to_owned());
        self.directory
            .create(&account)
            .await
            .map_err(insert_failure(email_taken))?;

        let affiliation = Affiliation::invite(account.id, gym.id, InviteType::New);
        if let Err(e) = self.affiliations.create(&affiliation).await {
            self.discard_placeholder(account.id).await;
            return Err(insert_failure(already_affiliated)(e));
        }

        let token = self.auth.generate_invite_token(&account)?;
        let link = self.invite_link(&token, &email);

        info!(
            requester = %requester.id,
            target = %account.id,
            affiliation_id = %affiliation.id,
            "New account invited"
        );
        spawn_dispatch(
            &self.notifier,
            AffiliationEvent::AccountInvite {
                affiliation_id: affiliation.id,
                user_id: account.id,
                email,
                display_name: account.display_name.clone(),
                gym_id: gym.id,
                link,
            },
        );

        Ok(NewAccountInvite {
            affiliation,
            account: AccountSummary::from(&account),
        })
    }

    /// Best-effort removal of a placeholder whose invitation is gone
    async fn discard_placeholder(&self, account_id: Uuid) {
        match self.directory.delete_unverified(account_id).await {
            Ok(true) => info!(user_id = %account_id, "Invite placeholder discarded"),
            Ok(false) => {}
            Err(e) => warn!(
                user_id = %account_id,
                error = %e,
                "Failed to discard invite placeholder"
            ),
        }
    }

    /// Complete an invited account and activate its affiliation
    ///
    /// Runs three non-atomic stages (set password, sign in, update profile);
    /// a failure reports which one broke.
    ///
    /// # Errors
    ///
    /// Returns a [`VerifyError`] whose stage code is 1 for sign-in, 2 for the
    /// profile update and 3 for everything before sign-in
    pub async fn verify_new_account(
        &self,
        request: &VerifyInviteRequest,
    ) -> Result<Session, VerifyError> {
        let mut errors = FieldErrors::new();
        errors.require("access_token", &request.access_token);
        errors.check("email", validation::check_email(&request.email));
        errors.check("username", validation::check_username(&request.username));
        errors.check_password("password", &request.password);
        errors.into_result().map_err(VerifyError::at(VerifyStage::Validation))?;

        let email = validation::normalize_email(&request.email);
        let claims = self
            .auth
            .validate_invite(request.access_token.trim(), &email)
            .map_err(|e| {
                AppLogger::log_security_event("invite_token_rejected", "low", &e.message, None);
                AppError::new(e.code, messages::INVALID_INVITE_TOKEN).with_title("Unauthorized")
            })
            .map_err(VerifyError::at(VerifyStage::Validation))?;

        let account = self
            .directory
            .find_by_email(&email)
            .await
            .map_err(AppError::from)
            .and_then(|found| {
                found.ok_or_else(|| {
                    AppError::new(ErrorCode::ResourceNotFound, messages::USER_NOT_FOUND)
                        .with_title(messages::USER_NOT_FOUND_TITLE)
                })
            })
            .map_err(VerifyError::at(VerifyStage::Validation))?;

        if claims.account_id().ok() != Some(account.id) {
            return Err(VerifyError::at(VerifyStage::Validation)(
                AppError::auth_invalid(messages::INVALID_INVITE_TOKEN).with_title("Unauthorized"),
            ));
        }
        if account.verified {
            return Err(VerifyError::at(VerifyStage::Validation)(
                AppError::invalid_state(messages::ACCOUNT_ALREADY_VERIFIED)
                    .with_title(messages::ACTION_DENIED),
            ));
        }

        let username_taken =
            || action_denied(ErrorCode::ResourceAlreadyExists, messages::USERNAME_TAKEN);
        match self.directory.find_by_username(&request.username).await {
            Ok(Some(other)) if other.id != account.id => {
                return Err(VerifyError::at(VerifyStage::Validation)(username_taken()));
            }
            Ok(_) => {}
            Err(e) => return Err(VerifyError::at(VerifyStage::Validation)(e.into())),
        }

        // Stage 0: password
        let hash = self
            .auth
            .hash_password(&request.password)
            .await
            .map_err(VerifyError::at(VerifyStage::Validation))?;
        self.directory
            .update_password(account.id, &hash)
            .await
            .map_err(|e| VerifyError::at(VerifyStage::Validation)(e.into()))?;

        // Stage 1: sign in with the new credentials
        let session = self
            .sign_in_after_password_set(&email, &request.password)
            .await
            .map_err(VerifyError::at(VerifyStage::SignIn))?;

        // Stage 2: profile
        self.complete_profile(&account, &request.username, username_taken)
            .await
            .map_err(VerifyError::at(VerifyStage::ProfileUpdate))?;

        AppLogger::log_auth_event(&account.id.to_string(), "invite_verified", true, None);
        Ok(session)
    }

    async fn sign_in_after_password_set(&self, email: &str, password: &str) -> AppResult<Session> {
        let invalid = || {
            AppError::auth_invalid(messages::INVALID_CREDENTIALS).with_title("Unauthorized")
        };
        let account = self
            .directory
            .find_by_email(email)
            .await?
            .ok_or_else(invalid)?;
        let hash = account.password_hash.as_deref().ok_or_else(invalid)?;
        if !self.auth.verify_password(password, hash).await? {
            return Err(invalid());
        }
        self.auth.create_session(&account)
    }

    async fn complete_profile(
        &self,
        account: &Account,
        username: &str,
        username_taken: impl Fn() -> AppError,
    ) -> AppResult<()> {
        let pending = self
            .affiliations
            .find_by_user(account.id)
            .await?
            .into_iter()
            .find(Affiliation::is_pending)
            .ok_or_else(|| {
                AppError::new(ErrorCode::ResourceNotFound, messages::INVITATION_WITHDRAWN)
                    .with_title(messages::AFFILIATION_NOT_FOUND)
                    .with_user_id(account.id)
            })?;

        self.directory
            .update_username(account.id, username)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    username_taken()
                } else {
                    AppError::from(e)
                }
            })?;
        if !self.affiliations.mark_verified(pending.id).await? {
            return Err(affiliation_not_found(pending.id));
        }
        self.directory.mark_verified(account.id).await?;

        AppLogger::log_affiliation_event(
            "verified",
            &pending.id.to_string(),
            &account.id.to_string(),
            &pending.belongs_to.to_string(),
        );
        Ok(())
    }

    /// Guards shared by accept and decline
    async fn own_pending_invitation(
        &self,
        affiliation_id: Uuid,
        requester_id: Uuid,
    ) -> AppResult<Affiliation> {
        let row = self.affiliation(affiliation_id).await?;
        if row.user_id != requester_id {
            return Err(action_denied(ErrorCode::AuthInvalid, messages::NOT_YOUR_INVITATION));
        }
        if !row.is_pending() {
            return Err(AppError::invalid_state(messages::INVITATION_NOT_PENDING)
                .with_title(messages::ACTION_DENIED));
        }
        Ok(row)
    }

    /// Accept a pending invitation addressed to the requester
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for a missing row, `AuthInvalid` when the row targets
    /// someone else, `InvalidState` when it is no longer pending
    pub async fn accept(&self, affiliation_id: Uuid, requester_id: Uuid) -> AppResult<Affiliation> {
        let mut row = self.own_pending_invitation(affiliation_id, requester_id).await?;
        if !self.affiliations.mark_verified(row.id).await? {
            return Err(AppError::invalid_state(messages::INVITATION_NOT_PENDING)
                .with_title(messages::ACTION_DENIED));
        }
        row.verified = true;

        AppLogger::log_affiliation_event(
            "accepted",
            &row.id.to_string(),
            &requester_id.to_string(),
            &row.belongs_to.to_string(),
        );
        spawn_dispatch(
            &self.notifier,
            AffiliationEvent::InviteAccepted {
                affiliation_id: row.id,
                user_id: row.user_id,
                gym_id: row.belongs_to,
            },
        );
        Ok(row)
    }

    /// Decline a pending invitation addressed to the requester
    ///
    /// # Errors
    ///
    /// Same as [`Self::accept`]; declining a deleted row is `ResourceNotFound`
    pub async fn decline(&self, affiliation_id: Uuid, requester_id: Uuid) -> AppResult<()> {
        let row = self.own_pending_invitation(affiliation_id, requester_id).await?;
        if !self.affiliations.delete(row.id).await? {
            return Err(affiliation_not_found(row.id));
        }

        AppLogger::log_affiliation_event(
            "declined",
            &row.id.to_string(),
            &requester_id.to_string(),
            &row.belongs_to.to_string(),
        );
        spawn_dispatch(
            &self.notifier,
            AffiliationEvent::InviteDeclined {
                affiliation_id: row.id,
                user_id: row.user_id,
                gym_id: row.belongs_to,
            },
        );
        Ok(())
    }

    /// Remove an affiliate (pending or active) from the requester's gym
    ///
    /// Withdrawing a pending new-account invite also discards its placeholder
    /// account. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` for a missing row, `AuthInvalid` when the requester
    /// does not own the row's gym
    pub async fn remove(&self, affiliation_id: Uuid, requester_id: Uuid) -> AppResult<bool> {
        let row = self.affiliation(affiliation_id).await?;
        let owns_gym = self
            .gyms
            .find_by_id(row.belongs_to)
            .await?
            .is_some_and(|gym| gym.owner_id == requester_id);
        if !owns_gym {
            return Err(action_denied(ErrorCode::AuthInvalid, messages::NOT_YOUR_GYM));
        }

        let deleted = self.affiliations.delete(row.id).await?;
        if deleted {
            AppLogger::log_affiliation_event(
                "removed",
                &row.id.to_string(),
                &requester_id.to_string(),
                &row.belongs_to.to_string(),
            );
            spawn_dispatch(
                &self.notifier,
                AffiliationEvent::AffiliateRemoved {
                    affiliation_id: row.id,
                    user_id: row.user_id,
                    gym_id: row.belongs_to,
                },
            );
            if row.invite_type == InviteType::New && row.is_pending() {
                self.discard_placeholder(row.user_id).await;
            }
        }
        Ok(deleted)
    }

    /// Join a gym by its referral code
    ///
    /// A pending invitation from the same gym is accepted instead.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a malformed code, `ResourceNotFound` for an unknown
    /// gym, `PermissionDenied` for gym owners, `ResourceAlreadyExists` when
    /// already affiliated elsewhere
    pub async fn join_by_referral(&self, requester_id: Uuid, code: &str) -> AppResult<Affiliation> {
        let code = ReferralCode::parse(code)?;
        let gym = self
            .gyms
            .find_by_referral_code(&code)
            .await?
            .ok_or_else(gym_not_found)?;
        let requester = self.requester(requester_id).await?;
        if requester.is_gym_owner() {
            return Err(action_denied(
                ErrorCode::PermissionDenied,
                messages::OWNERS_CANNOT_JOIN,
            ));
        }

        let existing = self.affiliations.find_by_user(requester.id).await?;
        if let Some(row) = existing.first() {
            if row.is_pending() && row.belongs_to == gym.id {
                return self.accept(row.id, requester.id).await;
            }
            return Err(already_affiliated());
        }

        let affiliation = Affiliation::referral(requester.id, gym.id);
        self.affiliations
            .create(&affiliation)
            .await
            .map_err(insert_failure(already_affiliated))?;

        AppLogger::log_affiliation_event(
            "referral_joined",
            &affiliation.id.to_string(),
            &requester.id.to_string(),
            &gym.id.to_string(),
        );
        spawn_dispatch(
            &self.notifier,
            AffiliationEvent::ReferralJoined {
                affiliation_id: affiliation.id,
                user_id: requester.id,
                gym_id: gym.id,
            },
        );
        Ok(affiliation)
    }

    /// Every affiliation of the requester's gym with the affiliate's public info
    ///
    /// # Errors
    ///
    /// `AuthInvalid` when the requester is not a gym owner, `ResourceNotFound`
    /// when they have no gym
    pub async fn list_gym_affiliates(&self, requester_id: Uuid) -> AppResult<Vec<AffiliateEntry>> {
        let requester = self.requester(requester_id).await?;
        if !requester.is_gym_owner() {
            return Err(not_gym_owner());
        }
        let gym = self.owned_gym(requester.id).await?;

        let rows = self.affiliations.list_by_gym(gym.id).await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(user) = self.directory.find_by_id(row.user_id).await? else {
                warn!(affiliation_id = %row.id, "Affiliation references a missing account");
                continue;
            };
            entries.push(AffiliateEntry {
                id: row.id,
                state: row.state(),
                invite_type: row.invite_type,
                created_at: row.created_at,
                user: AccountSummary::from(&user),
            });
        }
        Ok(entries)
    }

    /// Pending invitations addressed to the requester
    ///
    /// # Errors
    ///
    /// Returns an error if a store call fails
    pub async fn list_invitations(&self, requester_id: Uuid) -> AppResult<Vec<Invitation>> {
        let rows = self.affiliations.find_by_user(requester_id).await?;
        let mut invitations = Vec::new();
        for row in rows.into_iter().filter(Affiliation::is_pending) {
            let Some(gym) = self.gyms.find_by_id(row.belongs_to).await? else {
                continue;
            };
            invitations.push(Invitation {
                affiliation_id: row.id,
                invite_type: row.invite_type,
                created_at: row.created_at,
                gym: GymSummary::from(&gym),
            });
        }
        Ok(invitations)
    }

    /// The gym the requester owns or actively belongs to
    ///
    /// # Errors
    ///
    /// `ResourceNotFound` when there is none
    pub async fn current_gym(&self, requester_id: Uuid) -> AppResult<Gym> {
        let requester = self.requester(requester_id).await?;
        if requester.is_gym_owner() {
            return self.owned_gym(requester.id).await;
        }

        let active = self
            .affiliations
            .find_by_user(requester.id)
            .await?
            .into_iter()
            .find(|row| row.verified);
        match active {
            Some(row) => self
                .gyms
                .find_by_id(row.belongs_to)
                .await?
                .ok_or_else(gym_not_found),
            None => Err(gym_not_found()),
        }
    }
}
