// ABOUTME: Route module organization for the Gymn HTTP API
// ABOUTME: Domain route groups plus the shared success envelope, body parsing and session cookie helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! Route module for the Gymn server
//!
//! Each domain module holds only route definitions and thin handlers that
//! delegate to the service layer. Successful responses share the
//! `{ "success": true, "data": ... }` envelope; failures are rendered by
//! `AppError`'s `IntoResponse`.

/// Affiliate invitation, verification and membership routes
pub mod affiliates;
/// Registration and login routes
pub mod auth;
/// Gym lookup and referral join routes
pub mod gym;
/// Health check routes
pub mod health;
/// Profile editing routes
pub mod profile;

pub use affiliates::AffiliateRoutes;
pub use auth::AuthRoutes;
pub use gym::GymRoutes;
pub use health::HealthRoutes;
pub use profile::ProfileRoutes;

use axum::extract::rejection::JsonRejection;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Session;
use crate::constants::auth::SESSION_COOKIE_NAME;
use crate::errors::{AppError, AppResult};

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    /// Payload
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a payload
    pub const fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Render with the given status
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}

/// Unwrap a JSON body, reporting parse failures as `InvalidFormat`
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            AppError::invalid_format(rejection.body_text()).with_title("Invalid request")
        })
}

/// Parse a path segment as an id
pub(crate) fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        AppError::invalid_format(format!("{what} id must be a UUID")).with_title("Invalid request")
    })
}

/// `Set-Cookie` value carrying a session
pub(crate) fn session_cookie(session: &Session, secure: bool) -> Option<HeaderValue> {
    let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
    let secure = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{SESSION_COOKIE_NAME}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}",
        session.token
    );
    HeaderValue::from_str(&cookie).ok()
}

/// Render a session payload and set its cookie
pub(crate) fn with_session_cookie(
    mut response: Response,
    session: &Session,
    secure: bool,
) -> Response {
    if let Some(cookie) = session_cookie(session, secure) {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
