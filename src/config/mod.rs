// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Environment-only configuration: server, database, auth, app links and CORS
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! Configuration module for the Gymn server
//!
//! Every setting is read from environment variables; there is no config file.

/// Database location and pool settings
pub mod database;
/// Environment and server configuration
pub mod environment;

pub use database::{DatabaseConfig, DatabaseUrl};
pub use environment::{AuthConfig, CorsConfig, Environment, ServerConfig};
