// ABOUTME: Gym route handlers: current gym lookup and joining by referral code
// ABOUTME: Session-authenticated thin handlers over AffiliationService
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use super::ApiResponse;
use crate::errors::AppError;
use crate::middleware::authenticate;
use crate::server::ServerResources;

/// Gym routes
pub struct GymRoutes;

impl GymRoutes {
    /// Create gym routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/gym", get(Self::handle_current))
            .route("/api/gym/join/:code", post(Self::handle_join))
            .with_state(resources)
    }

    /// Handle GET /api/gym - gym the caller owns or belongs to
    async fn handle_current(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let caller = authenticate(&headers, &resources.auth)?;
        let gym = resources.affiliations.current_gym(caller.account_id).await?;
        Ok(ApiResponse::new(gym).into_response())
    }

    /// Handle POST /api/gym/join/:code - join by referral code
    async fn handle_join(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(code): Path<String>,
    ) -> Result<Response, AppError> {
        let caller = authenticate(&headers, &resources.auth)?;
        let affiliation = resources
            .affiliations
            .join_by_referral(caller.account_id, &code)
            .await?;
        Ok(ApiResponse::new(affiliation).into_response())
    }
}
