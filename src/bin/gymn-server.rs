// ABOUTME: Server binary for the Gymn affiliation API
// ABOUTME: Loads environment configuration, applies CLI overrides, opens the database and serves HTTP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn

//! # Gymn Server Binary
//!
//! Starts the HTTP API with structured logging, `SQLite` storage and
//! graceful shutdown on SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gymn_server::config::{DatabaseUrl, ServerConfig};
use gymn_server::database::Database;
use gymn_server::logging;
use gymn_server::server::{self, ServerResources};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gymn-server")]
#[command(about = "Gymn - gym affiliation API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override database URL (`sqlite:<path>` or `sqlite::memory:`)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(url) = args.database_url {
        config.database.url = DatabaseUrl::parse_url(&url)
            .with_context(|| format!("Invalid --database-url {url}"))?;
    }
    config.validate()?;

    logging::init_from_env()?;
    info!("Starting Gymn server");
    info!("{}", config.summary());

    let database = Database::new(&config.database)
        .await
        .context("Failed to open database")?;

    let resources = Arc::new(ServerResources::with_log_notifications(config, database));
    if let Err(e) = server::run(resources).await {
        error!("Server error: {e:#}");
        return Err(e);
    }

    info!("Gymn server stopped");
    Ok(())
}
