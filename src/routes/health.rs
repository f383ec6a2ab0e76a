// ABOUTME: Health check route for service monitoring
// ABOUTME: Reports service status and database reachability
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::constants::endpoints::HEALTH_CHECK;
use crate::logging::SERVICE_NAME;
use crate::server::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(HEALTH_CHECK, get(Self::handle_health))
            .with_state(resources)
    }

    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Response {
        let database = resources.database.health_check().await;
        let status = if database.is_ok() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        if let Err(e) = &database {
            tracing::warn!(error = %e, "Health check could not reach the database");
        }

        (
            status,
            Json(json!({
                "status": if database.is_ok() { "healthy" } else { "degraded" },
                "service": SERVICE_NAME,
                "version": env!("CARGO_PKG_VERSION"),
                "database": database.is_ok(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response()
    }
}
