// ABOUTME: Session authentication for HTTP handlers
// ABOUTME: Reads the JWT from the Authorization header or the auth_token cookie and validates it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::constants::auth::SESSION_COOKIE_NAME;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;

/// Header carrying the request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Caller identity established from a valid session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    /// Account id from the token subject
    pub account_id: Uuid,
    /// Email the session was issued for
    pub email: String,
}

/// Value of a cookie from the `Cookie` headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Bearer token from `Authorization`, falling back to the session cookie
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned);

    bearer.or_else(|| get_cookie_value(headers, SESSION_COOKIE_NAME))
}

/// Request id set by the request-id layer, if any
#[must_use]
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(ToOwned::to_owned)
}

/// Authenticate a request from its headers
///
/// # Errors
///
/// `AuthRequired` when no token is present, `AuthInvalid`/`AuthExpired` when
/// it does not validate as a session
#[tracing::instrument(skip(headers, auth), fields(user_id = tracing::field::Empty))]
pub fn authenticate(headers: &HeaderMap, auth: &AuthManager) -> AppResult<AuthenticatedAccount> {
    let attach_request_id = |error: AppError| match request_id(headers) {
        Some(id) => error.with_request_id(id),
        None => error,
    };

    let token = session_token(headers).ok_or_else(|| attach_request_id(AppError::auth_required()))?;

    let claims = auth.validate_session(&token).map_err(|e| {
        AppLogger::log_security_event("session_rejected", "low", &e.message, None);
        attach_request_id(e)
    })?;
    let account_id = claims.account_id().map_err(attach_request_id)?;

    tracing::Span::current().record("user_id", account_id.to_string());
    Ok(AuthenticatedAccount {
        account_id,
        email: claims.email,
    })
}
