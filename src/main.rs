//! # Solr Search UI - Main Application Entry Point
//!
//! This is the main binary for the Solr Search UI backend.
//! It initializes all services, configures the HTTP server, and starts
//! the application with proper logging and error handling.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- --port 3000 --solr-url http://localhost:8983/solr/
//! ```
//!
//! ## Environment Variables
//!
//! Solr location, admin key and the optional CosmosDB credentials are read
//! from the environment (or a `.env` file). See [`Config::from_env`].

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use solr_search_ui::{create_router, AppState, Args, Config, SolrApi, StorageService};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Main application entry point.
///
/// Initializes logging, loads configuration, creates service instances,
/// and starts the HTTP server with appropriate middleware.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    info!("Starting Solr Search UI on port {}", args.port);

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(solr_url) = args.solr_url {
        config.solr.url = solr_url;
    }
    let config = Arc::new(config);
    info!(
        "Loaded configuration for environment: {} (Solr at {})",
        config.environment, config.solr.url
    );
    if config.is_production() && config.application.admin_api_key == "admin-key-change-me" {
        warn!("⚠️ ADMIN_API_KEY is not set, admin pages use the default key");
    }

    // Initialize services
    let solr = Arc::new(SolrApi::new(config.clone())?);
    let storage = Arc::new(StorageService::new(config.clone()).await?);
    if storage.is_persistent() {
        info!("Core settings are persisted to CosmosDB");
    } else {
        info!("Core settings are kept in memory only");
    }

    // Create application state
    let app_state = AppState {
        config,
        solr,
        storage,
    };

    // Create router with middleware
    let app = create_router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", args.port)).await?;
    info!("Server listening on http://0.0.0.0:{}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
