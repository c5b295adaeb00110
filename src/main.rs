// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clockwork API Server
//!
//! Records clock-in and clock-out punches per local calendar day and keeps
//! an auditable history of every correction.

use clockwork::{
    config::{Config, StoreKind},
    db::{AttendanceStore, FirestoreDb, MemoryStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        timezone = %config.timezone,
        store = ?config.store,
        "Starting Clockwork API"
    );

    match config.store {
        StoreKind::Firestore => {
            let db = FirestoreDb::new(&config.gcp_project_id).await?;
            serve(config, db).await
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            serve(config, MemoryStore::new()).await
        }
    }
}

async fn serve<S: AttendanceStore + Clone>(
    config: Config,
    store: S,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(config, store));
    let app = clockwork::routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clockwork=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
