//! SLA ledger bridge: entry point.
//!
//! Hosts the SLA ledger's world state, consumes SLA and violation records
//! from the broker and submits them as ledger transactions, runs the daily
//! refund sweep, and exposes a small Axum REST API for inspection.

mod api;
mod bridge;
mod broker;
mod config;
mod db;
mod errors;
mod events;
mod identity;
mod ledger;
mod scheduler;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sla_ledger::SlaLedger;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bridge::BridgeState;
use config::Config;
use identity::IdentityClient;
use ledger::LedgerHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // The hosted ledger, seeded from the persisted world state.
    let ledger = LedgerHandle::open(pool.clone(), SlaLedger::new(config.ledger.clone())).await?;

    // HTTP client shared by the broker consumer and the identity service.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let identity = config
        .identity_endpoint
        .as_deref()
        .map(|endpoint| IdentityClient::new(client.clone(), endpoint, &config.identity_org));
    if identity.is_none() {
        warn!("IDENTITY_ENDPOINT not set, users are registered without public keys");
    }

    let shutdown = CancellationToken::new();

    // ─── Background consumer ──────────────────────────────
    let bridge_state = Arc::new(BridgeState {
        pool: pool.clone(),
        config: config.clone(),
        client,
        ledger: ledger.clone(),
        identity,
    });
    let consumer_task = tokio::spawn(bridge::run(bridge_state, shutdown.clone()));

    // ─── Daily refund ─────────────────────────────────────
    let scheduler_task = tokio::spawn(scheduler::run(
        ledger.clone(),
        config.refund_at,
        shutdown.clone(),
    ));

    // ─── REST API ─────────────────────────────────────────
    let api_state = Arc::new(api::ApiState { pool, ledger });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/events", get(api::get_all_events))
        .route("/contracts", get(api::get_contracts))
        .route("/contracts/:id", get(api::get_contract))
        .route("/contracts/:id/events", get(api::get_contract_events))
        .route("/users/:id/balance", get(api::get_balance))
        .route("/refunds", post(api::post_refunds))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let api_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { api_shutdown.cancelled().await })
        .await?;

    shutdown.cancel();
    let _ = tokio::join!(consumer_task, scheduler_task);
    Ok(())
}
