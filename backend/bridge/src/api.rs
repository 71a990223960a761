//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use sla_ledger::{Amount, ContractRecord, ErrorKind};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::BridgeError;
use crate::events::EventRecord;
use crate::ledger::LedgerHandle;
use crate::scheduler;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub ledger: LedgerHandle,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ContractEventsResponse {
    pub contract_id: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct ContractsResponse {
    pub count: usize,
    pub contracts: Vec<ContractRecord>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub user: String,
    pub balance: Amount,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub tx_id: String,
    pub report: Value,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

fn status_for(e: &BridgeError) -> StatusCode {
    match e {
        BridgeError::Ledger(ledger) => match ledger.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MalformedPayload | ErrorKind::InvalidAmount => StatusCode::BAD_REQUEST,
            ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: BridgeError) -> Response {
    (
        status_for(&e),
        Json(ErrorResponse {
            error: e.to_string(),
            kind: e.kind(),
        }),
    )
        .into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events`
///
/// Returns every processed broker record with its outcome.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Response {
    match db::get_all_events(&state.pool).await {
        Ok(events) => {
            let count = events.len();
            (StatusCode::OK, Json(AllEventsResponse { count, events })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /contracts/:id/events`
pub async fn get_contract_events(
    State(state): State<Arc<ApiState>>,
    Path(contract_id): Path<String>,
) -> Response {
    match db::get_events_for_contract(&state.pool, &contract_id).await {
        Ok(events) => {
            let count = events.len();
            (
                StatusCode::OK,
                Json(ContractEventsResponse {
                    contract_id,
                    count,
                    events,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /contracts`
pub async fn get_contracts(State(state): State<Arc<ApiState>>) -> Response {
    match state
        .ledger
        .query(|engine, world| engine.get_all_contracts(world))
        .await
    {
        Ok(contracts) => {
            let count = contracts.len();
            (StatusCode::OK, Json(ContractsResponse { count, contracts })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /contracts/:id`
pub async fn get_contract(
    State(state): State<Arc<ApiState>>,
    Path(contract_id): Path<String>,
) -> Response {
    match state
        .ledger
        .query(move |engine, world| engine.read_contract(world, &contract_id))
        .await
    {
        Ok(contract) => (StatusCode::OK, Json(contract)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /users/:id/balance`
///
/// `id` may be a user id or a public key.
pub async fn get_balance(
    State(state): State<Arc<ApiState>>,
    Path(user): Path<String>,
) -> Response {
    let lookup = user.clone();
    match state
        .ledger
        .query(move |engine, world| engine.user_balance(world, &lookup))
        .await
    {
        Ok(balance) => (StatusCode::OK, Json(BalanceResponse { user, balance })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /refunds`
///
/// Runs the refund sweep now instead of waiting for the daily schedule.
pub async fn post_refunds(State(state): State<Arc<ApiState>>) -> Response {
    match scheduler::sweep(&state.ledger).await {
        Ok((tx_id, report)) => {
            (StatusCode::OK, Json(RefundResponse { tx_id, report })).into_response()
        }
        Err(e) => error_response(e),
    }
}
