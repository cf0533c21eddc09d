// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! RideLink API Server
//!
//! Carpooling backend: drivers offer rides, passengers book seats, and
//! both sides are notified as bookings move through their lifecycle.

use ridelink::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, RideStore},
    services::PushDispatcher,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        "Starting RideLink API"
    );

    let store: Arc<dyn RideStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier = Arc::new(PushDispatcher::new(
        config.push_api_url.clone(),
        config.push_timeout_secs,
        store.clone(),
    )?);
    tracing::info!(url = %config.push_api_url, "Push dispatcher initialized");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, notifier));

    // Build router
    let app = ridelink::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ridelink=debug,info")),
        )
        .with(format)
        .init();
}
