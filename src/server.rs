// ABOUTME: HTTP server assembly: shared resources, router composition and serving
// ABOUTME: Wires repositories, services and tower-http layers, with graceful shutdown on signals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::Router;
use http::{HeaderName, Request};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::repositories::{
    AffiliationStore, AffiliationStoreImpl, Directory, DirectoryImpl, GymRegistry,
    GymRegistryImpl,
};
use crate::database::Database;
use crate::middleware::auth::REQUEST_ID_HEADER;
use crate::middleware::setup_cors;
use crate::notifications::{LogNotificationDispatcher, NotificationDispatcher};
use crate::routes::{AffiliateRoutes, AuthRoutes, GymRoutes, HealthRoutes, ProfileRoutes};
use crate::services::{AffiliationService, RegistrationService};

/// Largest accepted request body
const MAX_BODY_BYTES: usize = 64 * 1024;
/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a request handler may need
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Storage
    pub database: Database,
    /// Token and password handling
    pub auth: Arc<AuthManager>,
    /// Affiliation workflow
    pub affiliations: AffiliationService,
    /// Registration, login and profile
    pub registration: RegistrationService,
}

impl ServerResources {
    /// Wire services over the `SQLite` repositories
    #[must_use]
    pub fn new(
        config: ServerConfig,
        database: Database,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let auth = Arc::new(AuthManager::from_config(&config.auth));
        let directory: Arc<dyn Directory> = Arc::new(DirectoryImpl::new(&database));
        let gyms: Arc<dyn GymRegistry> = Arc::new(GymRegistryImpl::new(&database));
        let affiliation_store: Arc<dyn AffiliationStore> =
            Arc::new(AffiliationStoreImpl::new(&database));

        let affiliations = AffiliationService::new(
            Arc::clone(&directory),
            Arc::clone(&gyms),
            affiliation_store,
            Arc::clone(&auth),
            notifier,
            config.app_base_url.clone(),
        );
        let registration = RegistrationService::new(directory, gyms, Arc::clone(&auth));

        Self {
            config: Arc::new(config),
            database,
            auth,
            affiliations,
            registration,
        }
    }

    /// Resources with the structured-log notification dispatcher
    #[must_use]
    pub fn with_log_notifications(config: ServerConfig, database: Database) -> Self {
        Self::new(config, database, Arc::new(LogNotificationDispatcher))
    }
}

/// Compose every route with tracing, request-id, CORS, timeout and body-limit layers
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let cors = setup_cors(&resources.config.cors);

    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(&resources)))
        .merge(AuthRoutes::routes(Arc::clone(&resources)))
        .merge(AffiliateRoutes::routes(Arc::clone(&resources)))
        .merge(GymRoutes::routes(Arc::clone(&resources)))
        .merge(ProfileRoutes::routes(resources))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}

/// Bind and serve until SIGINT or SIGTERM
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn run(resources: Arc<ServerResources>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], resources.config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, build_router(resources))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
