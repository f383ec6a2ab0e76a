// ABOUTME: Affiliate route handlers: invites, invite verification, accept/decline, removal and listings
// ABOUTME: The verify endpoint reports failures as 400 with a numeric stage code
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{json_body, parse_id, with_session_cookie, ApiResponse};
use crate::errors::{AppError, ErrorResponse, ErrorResponseDetails};
use crate::middleware::{authenticate, AuthenticatedAccount};
use crate::models::InviteSelector;
use crate::server::ServerResources;
use crate::services::{VerifyError, VerifyInviteRequest, VerifyStage};

/// Body of an existing-account invite; exactly one field must be set
#[derive(Debug, Default, Deserialize)]
pub struct InviteExistingRequest {
    /// Target email
    #[serde(default)]
    pub email: Option<String>,
    /// Target username
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of a new-account invite
#[derive(Debug, Deserialize)]
pub struct InviteNewRequest {
    /// Name for the placeholder account
    pub display_name: String,
    /// Where the invitation goes
    pub email: String,
}

/// Body of a removal
#[derive(Debug, Deserialize)]
pub struct RemoveAffiliateRequest {
    /// Affiliation id
    pub id: Uuid,
}

/// Removal outcome
#[derive(Debug, Serialize)]
pub struct RemoveAffiliateResponse {
    /// Affiliation id
    pub id: Uuid,
    /// Whether a row was deleted
    pub removed: bool,
}

/// Verify failure body: the usual error plus the stage code
#[derive(Debug, Serialize)]
pub struct VerifyFailure {
    /// Always false
    pub success: bool,
    /// Error payload
    pub error: ErrorResponseDetails,
    /// 1 sign-in, 2 profile update, 3 validation
    pub code: u8,
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        if self.error.category() == crate::errors::ErrorCategory::UnknownError {
            tracing::error!(
                stage = self.stage.code(),
                source = ?self.error.source,
                "Invite verification failed: {}",
                self.error.message
            );
        } else {
            tracing::debug!(stage = self.stage.code(), "Invite verification rejected: {}", self.error.message);
        }
        let body = VerifyFailure {
            success: false,
            error: ErrorResponse::from(&self.error).error,
            code: self.stage.code(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

/// Affiliate routes
pub struct AffiliateRoutes;

impl AffiliateRoutes {
    /// Create all affiliate routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/affiliates", get(Self::handle_list))
            .route("/api/affiliates/invitations", get(Self::handle_invitations))
            .route(
                "/api/affiliates/invite/existing",
                post(Self::handle_invite_existing),
            )
            .route("/api/affiliates/invite/new", post(Self::handle_invite_new))
            .route("/api/affiliates/verify", post(Self::handle_verify))
            .route("/api/affiliates/remove", post(Self::handle_remove))
            .route("/api/affiliates/:id/accept", post(Self::handle_accept))
            .route("/api/affiliates/:id/decline", post(Self::handle_decline))
            .with_state(resources)
    }

    fn authenticate(
        headers: &HeaderMap,
        resources: &ServerResources,
    ) -> Result<AuthenticatedAccount, AppError> {
        authenticate(headers, &resources.auth)
    }

    /// Handle GET /api/affiliates - gym owner's affiliates
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let entries = resources
            .affiliations
            .list_gym_affiliates(caller.account_id)
            .await?;
        Ok(ApiResponse::new(entries).into_response())
    }

    /// Handle GET /api/affiliates/invitations - caller's pending invitations
    async fn handle_invitations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let invitations = resources
            .affiliations
            .list_invitations(caller.account_id)
            .await?;
        Ok(ApiResponse::new(invitations).into_response())
    }

    /// Handle POST /api/affiliates/invite/existing
    async fn handle_invite_existing(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<InviteExistingRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let body = json_body(payload)?;
        let selector =
            InviteSelector::from_parts(body.email.as_deref(), body.username.as_deref())?;

        let affiliation = resources
            .affiliations
            .invite_existing(caller.account_id, &selector)
            .await?;
        Ok(ApiResponse::new(affiliation).into_response())
    }

    /// Handle POST /api/affiliates/invite/new
    async fn handle_invite_new(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<InviteNewRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let body = json_body(payload)?;

        let invite = resources
            .affiliations
            .invite_new(caller.account_id, &body.display_name, &body.email)
            .await?;
        Ok(ApiResponse::new(invite).into_response())
    }

    /// Handle POST /api/affiliates/verify - complete an invited account
    async fn handle_verify(
        State(resources): State<Arc<ServerResources>>,
        payload: Result<Json<VerifyInviteRequest>, JsonRejection>,
    ) -> Result<Response, VerifyError> {
        let request = json_body(payload).map_err(|error| VerifyError {
            stage: VerifyStage::Validation,
            error,
        })?;

        let session = resources.affiliations.verify_new_account(&request).await?;
        let secure = resources.config.environment.is_production();
        Ok(with_session_cookie(
            ApiResponse::new(&session).into_response(),
            &session,
            secure,
        ))
    }

    /// Handle POST /api/affiliates/remove
    async fn handle_remove(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        payload: Result<Json<RemoveAffiliateRequest>, JsonRejection>,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let body = json_body(payload)?;

        let removed = resources
            .affiliations
            .remove(body.id, caller.account_id)
            .await?;
        Ok(ApiResponse::new(RemoveAffiliateResponse {
            id: body.id,
            removed,
        })
        .into_response())
    }

    /// Handle POST /api/affiliates/:id/accept
    async fn handle_accept(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let id = parse_id(&id, "Affiliation")?;

        let affiliation = resources
            .affiliations
            .accept(id, caller.account_id)
            .await?;
        Ok(ApiResponse::new(affiliation).into_response())
    }

    /// Handle POST /api/affiliates/:id/decline
    async fn handle_decline(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let caller = Self::authenticate(&headers, &resources)?;
        let id = parse_id(&id, "Affiliation")?;

        resources.affiliations.decline(id, caller.account_id).await?;
        Ok(ApiResponse::new(serde_json::json!({ "id": id, "declined": true })).into_response())
    }
}
