// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory databases, wired services, captured notifications and account seeding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `gymn_server`

use std::sync::{Arc, Once};
use std::time::Duration;

use gymn_server::auth::AuthManager;
use gymn_server::config::{DatabaseConfig, Environment, ServerConfig};
use gymn_server::database::repositories::{
    AffiliationStore, AffiliationStoreImpl, Directory, DirectoryImpl, GymRegistry,
    GymRegistryImpl,
};
use gymn_server::database::Database;
use gymn_server::notifications::{
    AffiliationEvent, BroadcastNotificationDispatcher, NotificationDispatcher,
};
use gymn_server::server::{build_router, ServerResources};
use gymn_server::services::{
    AffiliationService, Registration, RegistrationForm, RegistrationService,
};
use tokio::sync::broadcast;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";
pub const TEST_PASSWORD: &str = "Valid123";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Server configuration for tests: in-memory database, cheap bcrypt, fixed secret
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.environment = Environment::Testing;
    config.database = DatabaseConfig::in_memory();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_owned();
    config.auth.bcrypt_cost = 4;
    config.app_base_url = "http://app.test".to_owned();
    config
}

/// Services wired over one database, with notifications captured on a broadcast channel
pub struct TestContext {
    pub database: Database,
    pub auth: Arc<AuthManager>,
    pub notifications: BroadcastNotificationDispatcher,
    pub directory: Arc<dyn Directory>,
    pub gyms: Arc<dyn GymRegistry>,
    pub store: Arc<dyn AffiliationStore>,
    pub affiliations: AffiliationService,
    pub registration: RegistrationService,
}

impl TestContext {
    /// Fresh in-memory database
    pub async fn new() -> Self {
        init_test_logging();
        let database = Database::in_memory().await.expect("in-memory database");
        Self::with_database(database)
    }

    /// Wire services over an existing database
    pub fn with_database(database: Database) -> Self {
        let directory: Arc<dyn Directory> = Arc::new(DirectoryImpl::new(&database));
        let gyms: Arc<dyn GymRegistry> = Arc::new(GymRegistryImpl::new(&database));
        let store: Arc<dyn AffiliationStore> = Arc::new(AffiliationStoreImpl::new(&database));
        Self::with_stores(database, directory, gyms, store)
    }

    /// Wire services over explicit store implementations
    pub fn with_stores(
        database: Database,
        directory: Arc<dyn Directory>,
        gyms: Arc<dyn GymRegistry>,
        store: Arc<dyn AffiliationStore>,
    ) -> Self {
        let config = test_config();
        let auth = Arc::new(AuthManager::from_config(&config.auth));
        let notifications = BroadcastNotificationDispatcher::default();
        let notifier: Arc<dyn NotificationDispatcher> = Arc::new(notifications.clone());

        let affiliations = AffiliationService::new(
            Arc::clone(&directory),
            Arc::clone(&gyms),
            Arc::clone(&store),
            Arc::clone(&auth),
            notifier,
            config.app_base_url,
        );
        let registration =
            RegistrationService::new(Arc::clone(&directory), Arc::clone(&gyms), Arc::clone(&auth));

        Self {
            database,
            auth,
            notifications,
            directory,
            gyms,
            store,
            affiliations,
            registration,
        }
    }

    /// Register a gym owner with a gym
    pub async fn owner(&self, email: &str, username: &str) -> Registration {
        register_owner(&self.registration, email, username).await
    }

    /// Register a member
    pub async fn member(&self, email: &str, username: &str) -> Registration {
        register_member(&self.registration, email, username).await
    }
}

pub async fn register_owner(
    registration: &RegistrationService,
    email: &str,
    username: &str,
) -> Registration {
    registration
        .register(RegistrationForm::GymOwner {
            email: email.to_owned(),
            username: username.to_owned(),
            display_name: "Gym Owner".to_owned(),
            password: TEST_PASSWORD.to_owned(),
            gym_name: "Iron Temple".to_owned(),
            gym_address: "Rua 7, #12".to_owned(),
        })
        .await
        .expect("owner registration")
}

pub async fn register_member(
    registration: &RegistrationService,
    email: &str,
    username: &str,
) -> Registration {
    registration
        .register(RegistrationForm::Member {
            email: email.to_owned(),
            username: username.to_owned(),
            display_name: "Member".to_owned(),
            password: TEST_PASSWORD.to_owned(),
        })
        .await
        .expect("member registration")
}

/// Full HTTP stack over an in-memory database
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub notifications: BroadcastNotificationDispatcher,
}

impl TestServer {
    pub async fn new() -> Self {
        init_test_logging();
        let config = test_config();
        let database = Database::new(&config.database)
            .await
            .expect("in-memory database");
        let notifications = BroadcastNotificationDispatcher::default();
        let resources = Arc::new(ServerResources::new(
            config,
            database,
            Arc::new(notifications.clone()),
        ));
        Self {
            resources,
            notifications,
        }
    }

    /// A fresh router sharing this server's resources
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.resources))
    }

    pub async fn owner(&self, email: &str, username: &str) -> Registration {
        register_owner(&self.resources.registration, email, username).await
    }

    pub async fn member(&self, email: &str, username: &str) -> Registration {
        register_member(&self.resources.registration, email, username).await
    }
}

/// Wait for the next event matching `pick`
pub async fn next_event<T>(
    rx: &mut broadcast::Receiver<AffiliationEvent>,
    mut pick: impl FnMut(AffiliationEvent) -> Option<T>,
) -> T {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("notification channel open");
            if let Some(found) = pick(event) {
                return found;
            }
        }
    })
    .await
    .expect("notification delivered in time")
}

/// Wait for an account invite and pull the token out of its link
pub async fn next_invite_token(rx: &mut broadcast::Receiver<AffiliationEvent>) -> String {
    let link = next_event(rx, |event| match event {
        AffiliationEvent::AccountInvite { link, .. } => Some(link),
        _ => None,
    })
    .await;

    let url = url::Url::parse(&link).expect("invite link is a URL");
    assert_eq!(url.path(), "/auth/verifyinvite");
    url.query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .expect("invite link carries a token")
}
