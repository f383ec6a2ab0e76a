// ABOUTME: Main library entry point for the Gymn affiliation server
// ABOUTME: Accounts, gyms and the invite/verify/accept/remove affiliation lifecycle over HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

#![deny(unsafe_code)]

//! # Gymn Server
//!
//! Backend for linking gym members to gyms. Gym owners invite existing
//! accounts by email or username, or invite someone who has no account yet;
//! invitees accept, decline or complete their registration, and owners can
//! remove affiliates. Members may also join directly with a gym's referral
//! code.
//!
//! ## Architecture
//!
//! - **services**: workflow rules over constructor-injected repository traits
//! - **database**: `SQLite` persistence and the `Directory`, `GymRegistry`
//!   and `AffiliationStore` implementations
//! - **auth**: session and invite tokens, password hashing
//! - **routes** / **server**: axum handlers and router assembly
//! - **notifications**: fire-and-forget delivery of lifecycle events
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gymn_server::config::ServerConfig;
//! use gymn_server::database::Database;
//! use gymn_server::server::{self, ServerResources};
//!
//! # async fn start() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env()?;
//! let database = Database::new(&config.database).await?;
//! let resources = Arc::new(ServerResources::with_log_notifications(config, database));
//! server::run(resources).await
//! # }
//! ```

/// Session and invite tokens plus password hashing
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// `SQLite` persistence and repository implementations
pub mod database;

/// Error types shared across the crate
pub mod errors;

/// Structured logging setup
pub mod logging;

/// Session authentication and CORS
pub mod middleware;

/// Affiliation event delivery
pub mod notifications;

/// HTTP route handlers
pub mod routes;

/// Router assembly and serving
pub mod server;

/// Workflow services
pub mod services;

/// Validation limits and user-facing texts
pub use gymn_core::constants;

/// Accounts, gyms and affiliations
pub use gymn_core::models;

/// Form validation rules
pub use gymn_core::validation;
