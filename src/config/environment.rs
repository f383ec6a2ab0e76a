// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Reads ports, secrets, token lifetimes, app links and CORS origins from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use gymn_core::constants::auth::{
    BCRYPT_MAX_COST, BCRYPT_MIN_COST, DEFAULT_BCRYPT_COST, DEFAULT_INVITE_EXPIRY_HOURS,
    DEFAULT_SESSION_EXPIRY_HOURS, JWT_SECRET_MIN_LENGTH,
};
use gymn_core::constants::ports::DEFAULT_HTTP_PORT;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::database::DatabaseConfig;

/// Default base URL of the web client, used to build invite links
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Session, invite and password hashing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for session and invite tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Session token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Invite token lifetime in hours
    pub invite_expiry_hours: i64,
    /// bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("invite_expiry_hours", &self.invite_expiry_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: generate_secret(),
            jwt_expiry_hours: DEFAULT_SESSION_EXPIRY_HOURS,
            invite_expiry_hours: DEFAULT_INVITE_EXPIRY_HOURS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

/// Cross-origin settings for the web client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_APP_BASE_URL.to_owned()],
        }
    }
}

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Database settings
    pub database: DatabaseConfig,
    /// Token and password settings
    pub auth: AuthConfig,
    /// Base URL of the web client; invite links point here
    pub app_base_url: String,
    /// CORS settings
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            environment: Environment::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            app_base_url: DEFAULT_APP_BASE_URL.to_owned(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a production
    /// deployment is missing its `JWT_SECRET`
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", ""));
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment.is_production() => {
                return Err(anyhow!("JWT_SECRET must be set when ENVIRONMENT=production"));
            }
            _ => {
                warn!("JWT_SECRET not set; using a random secret, sessions will not survive restarts");
                generate_secret()
            }
        };

        let config = Self {
            http_port: parse_env("HTTP_PORT", DEFAULT_HTTP_PORT)?,
            environment,
            database: DatabaseConfig::from_env().context("Invalid database configuration")?,
            auth: AuthConfig {
                jwt_secret,
                jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", DEFAULT_SESSION_EXPIRY_HOURS)?,
                invite_expiry_hours: parse_env(
                    "INVITE_EXPIRY_HOURS",
                    DEFAULT_INVITE_EXPIRY_HOURS,
                )?,
                bcrypt_cost: parse_env("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
            },
            app_base_url: env_var_or("APP_BASE_URL", DEFAULT_APP_BASE_URL),
            cors: CorsConfig {
                allowed_origins: parse_origins(&env_var_or(
                    "CORS_ALLOWED_ORIGINS",
                    DEFAULT_APP_BASE_URL,
                )),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.app_base_url)
            .with_context(|| format!("APP_BASE_URL is not a valid URL: {}", self.app_base_url))?;

        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.auth.bcrypt_cost) {
            return Err(anyhow!(
                "BCRYPT_COST must be between {BCRYPT_MIN_COST} and {BCRYPT_MAX_COST}"
            ));
        }

        if self.auth.jwt_expiry_hours <= 0 || self.auth.invite_expiry_hours <= 0 {
            return Err(anyhow!("Token expiry hours must be positive"));
        }

        if self.environment.is_production() && self.auth.jwt_secret.len() < JWT_SECRET_MIN_LENGTH
        {
            return Err(anyhow!(
                "JWT_SECRET must be at least {JWT_SECRET_MIN_LENGTH} characters in production"
            ));
        }

        if self.cors.allowed_origins.iter().any(|o| o == "*") && self.environment.is_production()
        {
            warn!("CORS allows any origin in production");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Gymn Server Configuration:\n\
             - Environment: {}\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - Session Expiry: {}h\n\
             - Invite Expiry: {}h\n\
             - App Base URL: {}\n\
             - CORS Origins: {}",
            self.environment,
            self.http_port,
            self.database.url,
            self.auth.jwt_expiry_hours,
            self.auth.invite_expiry_hours,
            self.app_base_url,
            self.cors.allowed_origins.join(", "),
        )
    }
}

/// Random alphanumeric secret for non-production runs
fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
