// ABOUTME: Registration and login route handlers
// ABOUTME: Thin handlers over RegistrationService that also set the session cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use super::{json_body, with_session_cookie, ApiResponse};
use crate::errors::AppError;
use crate::server::ServerResources;
use crate::services::RegistrationForm;

/// Login body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create registration and login routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/register", post(Self::handle_register))
            .route("/api/auth/login", post(Self::handle_login))
            .with_state(resources)
    }

    /// Handle POST /api/auth/register
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        payload: Result<Json<RegistrationForm>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let form = json_body(payload)?;
        let registration = resources.registration.register(form).await?;

        let secure = resources.config.environment.is_production();
        let session = registration.session.clone();
        Ok(with_session_cookie(
            ApiResponse::new(registration).with_status(StatusCode::CREATED),
            &session,
            secure,
        ))
    }

    /// Handle POST /api/auth/login
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        payload: Result<Json<LoginRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let body = json_body(payload)?;
        let session = resources
            .registration
            .login(&body.email, &body.password)
            .await?;

        let secure = resources.config.environment.is_production();
        Ok(with_session_cookie(
            ApiResponse::new(&session).with_status(StatusCode::OK),
            &session,
            secure,
        ))
    }
}
