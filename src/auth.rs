// ABOUTME: JWT-based session and invite tokens plus bcrypt password hashing
// ABOUTME: Handles token minting, purpose/audience/expiry validation, and blocking hash work
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Authentication and Session Management
//!
//! Two kinds of HS256 tokens share one secret and are told apart by their
//! `purpose` claim: login sessions and new-account invites. An invite token is
//! scoped to the email it was sent to and cannot be used as a session.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tokio::task;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::constants::auth::{TOKEN_AUDIENCE, TOKEN_ISSUER};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::Account;

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    /// Logged-in session
    Session,
    /// Completing an invited account
    Invite,
}

impl Display for TokenPurpose {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session => write!(f, "session"),
            Self::Invite => write!(f, "invite"),
        }
    }
}

/// `JWT` validation error with detailed information
#[derive(Debug, Clone)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
        /// Current time for reference
        current_time: DateTime<Utc>,
    },
    /// Token signature, audience or issuer is invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
    /// Token was minted for another purpose
    WrongPurpose {
        /// Purpose the caller required
        expected: TokenPurpose,
        /// Purpose carried by the token
        found: TokenPurpose,
    },
}

impl Display for JwtValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenExpired {
                expired_at,
                current_time,
            } => {
                let minutes = current_time.signed_duration_since(*expired_at).num_minutes();
                write!(
                    f,
                    "JWT token expired {minutes} minutes ago at {}",
                    expired_at.format("%Y-%m-%d %H:%M:%S UTC")
                )
            }
            Self::TokenInvalid { reason } => write!(f, "JWT token is invalid: {reason}"),
            Self::TokenMalformed { details } => write!(f, "JWT token is malformed: {details}"),
            Self::WrongPurpose { expected, found } => {
                write!(f, "JWT token purpose is {found}, expected {expected}")
            }
        }
    }
}

impl std::error::Error for JwtValidationError {}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        let code = if matches!(error, JwtValidationError::TokenExpired { .. }) {
            ErrorCode::AuthExpired
        } else {
            ErrorCode::AuthInvalid
        };
        Self::new(code, error.to_string()).with_title("Unauthorized")
    }
}

/// `JWT` claims shared by session and invite tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account `ID`
    pub sub: String,
    /// Account email
    pub email: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience (who the token is intended for)
    pub aud: String,
    /// Issuer
    pub iss: String,
    /// Session or invite
    pub purpose: TokenPurpose,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Account id carried in `sub`
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` if `sub` is not a UUID
    pub fn account_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::auth_invalid("Token subject is not a valid account id"))
    }
}

/// A freshly minted login session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token
    pub token: String,
    /// Account the session belongs to
    pub user_id: Uuid,
    /// Account email
    pub email: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Authentication manager for `JWT` tokens and password hashes
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_expiry_hours: i64,
    invite_expiry_hours: i64,
    bcrypt_cost: u32,
}

impl AuthManager {
    /// Create a new authentication manager
    #[must_use]
    pub fn new(
        secret: &[u8],
        session_expiry_hours: i64,
        invite_expiry_hours: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            session_expiry_hours,
            invite_expiry_hours,
            bcrypt_cost,
        }
    }

    /// Create from configuration
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            config.jwt_expiry_hours,
            config.invite_expiry_hours,
            config.bcrypt_cost,
        )
    }

    fn mint(
        &self,
        account_id: Uuid,
        email: &str,
        purpose: TokenPurpose,
        lifetime: Duration,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + lifetime;
        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_lowercase(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            aud: TOKEN_AUDIENCE.to_owned(),
            iss: TOKEN_ISSUER.to_owned(),
            purpose,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))?;
        Ok((token, expires_at))
    }

    /// Create a login session for a verified account
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn create_session(&self, account: &Account) -> AppResult<Session> {
        let (token, expires_at) = self.mint(
            account.id,
            &account.email,
            TokenPurpose::Session,
            Duration::hours(self.session_expiry_hours),
        )?;
        Ok(Session {
            token,
            user_id: account.id,
            email: account.email.clone(),
            expires_at,
        })
    }

    /// Mint the access token embedded in an invite link
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn generate_invite_token(&self, account: &Account) -> AppResult<String> {
        self.generate_token_with_lifetime(
            account,
            TokenPurpose::Invite,
            Duration::hours(self.invite_expiry_hours),
        )
    }

    /// Mint a token with an explicit lifetime (negative lifetimes yield expired tokens)
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn generate_token_with_lifetime(
        &self,
        account: &Account,
        purpose: TokenPurpose,
        lifetime: Duration,
    ) -> AppResult<String> {
        self.mint(account.id, &account.email, purpose, lifetime)
            .map(|(token, _)| token)
    }

    /// Validate a token and require a purpose
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] when the token is malformed, forged,
    /// expired or minted for another purpose
    pub fn validate_token_detailed(
        &self,
        token: &str,
        expected: TokenPurpose,
    ) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[TOKEN_ISSUER]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| convert_jwt_error(&e))?;

        let current_time = Utc::now();
        if current_time.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(current_time);
            tracing::debug!(user = %claims.sub, purpose = %claims.purpose, "Rejected expired token");
            return Err(JwtValidationError::TokenExpired {
                expired_at,
                current_time,
            });
        }

        if claims.purpose != expected {
            return Err(JwtValidationError::WrongPurpose {
                expected,
                found: claims.purpose,
            });
        }

        Ok(claims)
    }

    /// Validate a session token
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` or `AuthExpired`
    pub fn validate_session(&self, token: &str) -> AppResult<Claims> {
        Ok(self.validate_token_detailed(token, TokenPurpose::Session)?)
    }

    /// Validate an invite token and require it to be scoped to `email`
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` or `AuthExpired`; a token for another email is `AuthInvalid`
    pub fn validate_invite(&self, token: &str, email: &str) -> AppResult<Claims> {
        let claims = self.validate_token_detailed(token, TokenPurpose::Invite)?;
        if !claims.email.eq_ignore_ascii_case(email.trim()) {
            return Err(AppError::auth_invalid("Invite token was issued for another email")
                .with_title("Unauthorized"));
        }
        Ok(claims)
    }

    /// Hash a password on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns an internal error if hashing fails
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
    }

    /// Check a password against a stored hash on the blocking pool
    ///
    /// # Errors
    ///
    /// Returns an internal error if the hash is unreadable
    pub async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))
    }
}

/// Convert JWT library errors to detailed validation errors
fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
    match e.kind() {
        ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
            reason: "Token signature verification failed".into(),
        },
        ErrorKind::InvalidAudience => JwtValidationError::TokenInvalid {
            reason: "Token audience mismatch".into(),
        },
        ErrorKind::InvalidIssuer => JwtValidationError::TokenInvalid {
            reason: "Token issuer mismatch".into(),
        },
        ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
            details: "Token format is invalid".into(),
        },
        ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
            details: format!("Token contains invalid base64: {base64_err}"),
        },
        ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
            details: format!("Token contains invalid JSON: {json_err}"),
        },
        _ => JwtValidationError::TokenInvalid {
            reason: format!("Token validation failed: {e}"),
        },
    }
}
