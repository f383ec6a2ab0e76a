// ABOUTME: Profile route handler for editing display name, bio and location
// ABOUTME: Session-authenticated thin handler over RegistrationService
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::put;
use axum::{Json, Router};

use super::{json_body, ApiResponse};
use crate::errors::AppError;
use crate::middleware::authenticate;
use crate::server::ServerResources;
use crate::services::ProfileUpdate;

/// Profile routes
pub struct ProfileRoutes;

impl ProfileRoutes {
    /// Create profile routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/profile", put(Self::handle_update))
            .with_state(resources)
    }

    /// Handle PUT /api/profile
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<ProfileUpdate>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let caller = authenticate(&headers, &resources.auth)?;
        let update = json_body(payload)?;
        let account = resources
            .registration
            .update_profile(caller.account_id, &update)
            .await?;
        Ok(ApiResponse::new(account).into_response())
    }
}
