// ABOUTME: Form validation rules for usernames, passwords, emails, names and profile fields
// ABOUTME: Collects every failing rule per field into one structured validation error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::constants::limits::{
    BIO_MAX_LENGTH, BIO_MAX_LINES, DISPLAY_NAME_MAX_LENGTH, DISPLAY_NAME_MIN_LENGTH,
    GYM_FIELD_MAX_LENGTH, GYM_FIELD_MIN_LENGTH, LOCATION_MAX_LENGTH, PASSWORD_MAX_LENGTH,
    PASSWORD_MIN_LENGTH, USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH,
};
use crate::constants::ACCENTED_LETTERS;
use crate::errors::{AppError, AppResult};

// Stored as Option so a pattern that fails to compile rejects input instead of panicking
static USERNAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{3,30}$").ok());

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

static DISPLAY_NAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(
        "^[a-zA-Z0-9_ {ACCENTED_LETTERS}]{{{DISPLAY_NAME_MIN_LENGTH},{DISPLAY_NAME_MAX_LENGTH}}}$"
    ))
    .ok()
});

static GYM_NAME_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(
        "^[a-zA-Z0-9 {ACCENTED_LETTERS}]{{{GYM_FIELD_MIN_LENGTH},{GYM_FIELD_MAX_LENGTH}}}$"
    ))
    .ok()
});

static GYM_ADDRESS_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(&format!(
        "^[a-zA-Z0-9 #°,{ACCENTED_LETTERS}]{{{GYM_FIELD_MIN_LENGTH},{GYM_FIELD_MAX_LENGTH}}}$"
    ))
    .ok()
});

fn matches(pattern: &LazyLock<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Trim and lowercase an email for storage and lookup
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Username: 3 to 30 ASCII letters or digits
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_username(username: &str) -> Result<(), String> {
    if matches(&USERNAME_PATTERN, username) {
        Ok(())
    } else {
        Err(format!(
            "Username must be {USERNAME_MIN_LENGTH} to {USERNAME_MAX_LENGTH} letters or digits"
        ))
    }
}

/// Email: something@something.tld without whitespace
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_email(email: &str) -> Result<(), String> {
    if matches(&EMAIL_PATTERN, email.trim()) {
        Ok(())
    } else {
        Err("Invalid email address".to_owned())
    }
}

/// Display name: 2 to 25 letters, digits, underscores or spaces
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_display_name(name: &str) -> Result<(), String> {
    if matches(&DISPLAY_NAME_PATTERN, name) {
        Ok(())
    } else {
        Err(format!(
            "Name must be {DISPLAY_NAME_MIN_LENGTH} to {DISPLAY_NAME_MAX_LENGTH} letters, digits, spaces or underscores"
        ))
    }
}

/// Gym name: 2 to 30 letters, digits or spaces
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_gym_name(name: &str) -> Result<(), String> {
    if matches(&GYM_NAME_PATTERN, name) {
        Ok(())
    } else {
        Err(format!(
            "Gym name must be {GYM_FIELD_MIN_LENGTH} to {GYM_FIELD_MAX_LENGTH} letters, digits or spaces"
        ))
    }
}

/// Gym address: like the gym name, plus `#`, `°` and `,`
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_gym_address(address: &str) -> Result<(), String> {
    if matches(&GYM_ADDRESS_PATTERN, address) {
        Ok(())
    } else {
        Err(format!(
            "Address must be {GYM_FIELD_MIN_LENGTH} to {GYM_FIELD_MAX_LENGTH} characters (letters, digits, spaces, #, ° or ,)"
        ))
    }
}

/// Bio: at most 160 characters over at most 4 lines
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > BIO_MAX_LENGTH {
        return Err(format!("Bio must be at most {BIO_MAX_LENGTH} characters"));
    }
    if bio.lines().count() > BIO_MAX_LINES {
        return Err(format!("Bio must be at most {BIO_MAX_LINES} lines"));
    }
    Ok(())
}

/// Location: at most 30 characters
///
/// # Errors
///
/// Returns the user-facing message when the rule fails.
pub fn check_location(location: &str) -> Result<(), String> {
    if location.chars().count() > LOCATION_MAX_LENGTH {
        Err(format!("Location must be at most {LOCATION_MAX_LENGTH} characters"))
    } else {
        Ok(())
    }
}

// ============================================================================
// Password policy
// ============================================================================

/// One rule of the password policy
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordRule {
    /// Fewer than 6 characters
    TooShort,
    /// More than 40 characters
    TooLong,
    /// No lowercase letter
    MissingLowercase,
    /// No uppercase letter
    MissingUppercase,
    /// No digit
    MissingDigit,
}

impl PasswordRule {
    /// Stable identifier used in response details
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::MissingLowercase => "missing_lowercase",
            Self::MissingUppercase => "missing_uppercase",
            Self::MissingDigit => "missing_digit",
        }
    }
}

impl Display for PasswordRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::TooShort => write!(f, "Password must be at least {PASSWORD_MIN_LENGTH} characters"),
            Self::TooLong => write!(f, "Password must be at most {PASSWORD_MAX_LENGTH} characters"),
            Self::MissingLowercase => write!(f, "Password must contain a lowercase letter"),
            Self::MissingUppercase => write!(f, "Password must contain an uppercase letter"),
            Self::MissingDigit => write!(f, "Password must contain a digit"),
        }
    }
}

/// Every password rule the candidate breaks, in policy order
#[must_use]
pub fn password_violations(password: &str) -> Vec<PasswordRule> {
    let length = password.chars().count();
    let mut broken = Vec::new();
    if length < PASSWORD_MIN_LENGTH {
        broken.push(PasswordRule::TooShort);
    }
    if length > PASSWORD_MAX_LENGTH {
        broken.push(PasswordRule::TooLong);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        broken.push(PasswordRule::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        broken.push(PasswordRule::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        broken.push(PasswordRule::MissingDigit);
    }
    broken
}

// ============================================================================
// Error collection
// ============================================================================

/// A single failed field rule
#[derive(Debug, Clone, Serialize)]
pub struct FieldIssue {
    /// Request field name
    pub field: &'static str,
    /// User-facing message
    pub message: String,
    /// Machine-readable rule, when the field has several
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<&'static str>,
}

/// Accumulates field issues so a form reports all of them at once
#[derive(Debug, Default)]
pub struct FieldErrors {
    issues: Vec<FieldIssue>,
}

impl FieldErrors {
    /// Empty collection
    #[must_use]
    pub const fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Record the outcome of a single-message rule
    pub fn check(&mut self, field: &'static str, outcome: Result<(), String>) {
        if let Err(message) = outcome {
            self.issues.push(FieldIssue {
                field,
                message,
                rule: None,
            });
        }
    }

    /// Record every broken password rule
    pub fn check_password(&mut self, field: &'static str, password: &str) {
        for rule in password_violations(password) {
            self.issues.push(FieldIssue {
                field,
                message: rule.to_string(),
                rule: Some(rule.as_str()),
            });
        }
    }

    /// Record a required field that was left blank
    pub fn require(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.issues.push(FieldIssue {
                field,
                message: format!("{field} is required"),
                rule: None,
            });
        }
    }

    /// Whether nothing failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues recorded so far
    #[must_use]
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// `Ok` when empty, otherwise one `InvalidInput` error listing every issue
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` with a `fields` array in the details.
    pub fn into_result(self) -> AppResult<()> {
        if self.issues.is_empty() {
            return Ok(());
        }
        let description = self
            .issues
            .iter()
            .map(|issue| issue.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Err(AppError::invalid_input(description)
            .with_title("Invalid request")
            .with_details(json!({ "fields": self.issues })))
    }
}
