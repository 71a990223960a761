//! Long-running background task that consumes SLA and violation records
//! from the broker and submits them to the hosted ledger.
//!
//! Every record ends up in the `events` table with its outcome. A record the
//! ledger rejects is logged and skipped; the loop moves on to the next one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sla_ledger::types::Party;
use sla_ledger::SlaDescriptor;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::{self, Consumer, RawRecord};
use crate::config::Config;
use crate::db;
use crate::errors::{BridgeError, Result};
use crate::events::{BusRecord, EventKind, Outcome, ProcessedEvent};
use crate::identity::IdentityClient;
use crate::ledger::LedgerHandle;

pub struct BridgeState {
    pub pool: SqlitePool,
    pub config: Config,
    pub client: Client,
    pub ledger: LedgerHandle,
    pub identity: Option<IdentityClient>,
}

/// Run the consumer loop until `shutdown` fires.
pub async fn run(state: Arc<BridgeState>, shutdown: CancellationToken) {
    info!(
        "Bridge starting, topics: {}, {}",
        state.config.sla_topic, state.config.violation_topic
    );

    let mut consumer: Option<Consumer> = None;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = poll_once(&state, &mut consumer) => {
                if let Err(e) = result {
                    error!("Bridge poll error: {e}");
                    // Start over with a fresh consumer instance.
                    consumer = None;
                }
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(state.config.poll_interval_secs)) => {}
        }
    }

    if let Some(consumer) = consumer {
        if let Err(e) = consumer.close().await {
            warn!("Failed to close consumer: {e}");
        }
    }
    info!("Bridge stopped");
}

/// Perform a single poll iteration: fetch, process, commit offsets.
async fn poll_once(state: &BridgeState, consumer: &mut Option<Consumer>) -> Result<()> {
    if consumer.is_none() {
        let topics = [
            state.config.sla_topic.clone(),
            state.config.violation_topic.clone(),
        ];
        let created = Consumer::create(
            &state.client,
            &state.config.broker_url,
            &state.config.consumer_group,
            &topics,
        )
        .await?;
        *consumer = Some(created);
    }
    let Some(consumer) = consumer.as_ref() else {
        return Ok(());
    };

    let records = consumer.poll(state.config.max_record_bytes).await?;
    if records.is_empty() {
        return Ok(());
    }

    let mut stored = 0usize;
    for raw in &records {
        if db::event_seen(&state.pool, &raw.topic, raw.partition, raw.offset).await? {
            debug!(
                topic = %raw.topic,
                partition = raw.partition,
                offset = raw.offset,
                "Record already processed, skipping"
            );
            continue;
        }
        let event = process_raw(state, raw).await;
        // Committed events were stored together with their write-set.
        if event.outcome == Outcome::Committed || db::insert_event(&state.pool, &event).await? {
            stored += 1;
        }
    }
    info!("Polled {} records → {} new events stored", records.len(), stored);

    consumer.commit(&broker::offsets_to_commit(&records)).await?;
    Ok(())
}

async fn process_raw(state: &BridgeState, raw: &RawRecord) -> ProcessedEvent {
    let kind = EventKind::from_topic(
        &raw.topic,
        &state.config.sla_topic,
        &state.config.violation_topic,
    );
    match broker::decode_record(raw) {
        Ok(record) => process_record(state, &record, kind).await,
        Err(e) => {
            warn!(topic = %raw.topic, offset = raw.offset, "Undecodable record: {e}");
            let record = BusRecord {
                topic: raw.topic.clone(),
                partition: raw.partition,
                offset: raw.offset,
                payload: Vec::new(),
            };
            ProcessedEvent::new(&record, kind, None).failed(&e)
        }
    }
}

/// Submit one record to the ledger and describe what happened.
pub async fn process_record(
    state: &BridgeState,
    record: &BusRecord,
    kind: EventKind,
) -> ProcessedEvent {
    let payload = match payload_text(record, state.config.max_record_bytes) {
        Ok(payload) => payload,
        Err(e) => return ProcessedEvent::new(record, kind, None).failed(&e),
    };
    let event = ProcessedEvent::new(record, kind, kind.contract_id(payload));

    let Some(function) = kind.function() else {
        debug!(topic = %record.topic, "Record on unhandled topic ignored");
        return event;
    };

    let result = async {
        if kind == EventKind::SlaContract {
            register_parties(state, payload).await?;
        }
        state
            .ledger
            .submit_recorded(function, &[payload.to_string()], &event)
            .await
    }
    .await;

    match result {
        Ok(committed) => {
            info!(
                function,
                contract = event.contract_id.as_deref().unwrap_or("-"),
                tx_id = %committed.tx_id,
                "Event committed"
            );
            event.committed(committed.tx_id)
        }
        Err(e) => {
            warn!(
                function,
                contract = event.contract_id.as_deref().unwrap_or("-"),
                kind = e.kind(),
                "Event not committed: {e}"
            );
            event.failed(&e)
        }
    }
}

fn payload_text(record: &BusRecord, max_bytes: usize) -> Result<&str> {
    if record.payload.len() > max_bytes {
        return Err(BridgeError::Payload(format!(
            "record of {} bytes exceeds the {max_bytes} byte limit",
            record.payload.len()
        )));
    }
    let text = std::str::from_utf8(&record.payload)
        .map_err(|e| BridgeError::Payload(format!("record is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(BridgeError::Payload("empty record".to_string()));
    }
    Ok(text)
}

/// Make sure both parties of an SLA are registered ledger users.
async fn register_parties(state: &BridgeState, payload: &str) -> Result<()> {
    let sla = SlaDescriptor::parse(payload)?;
    ensure_user(state, &sla.details.provider).await?;
    ensure_user(state, &sla.details.client).await?;
    Ok(())
}

async fn ensure_user(state: &BridgeState, party: &Party) -> Result<()> {
    let id = party.id.clone();
    let exists = state
        .ledger
        .query(move |engine, world| engine.user_exists(world, &id))
        .await?;
    if exists {
        return Ok(());
    }

    let name = party.display_name().to_string();
    let public_key = match &state.identity {
        Some(identity) => identity.enroll(&name).await?,
        None => String::new(),
    };
    let committed = state
        .ledger
        .submit(
            "CreateUser",
            &[
                name,
                party.id.clone(),
                public_key,
                state.config.user_start_balance.to_string(),
            ],
        )
        .await?;
    info!(user = %party.id, tx_id = %committed.tx_id, "User registered");
    Ok(())
}
