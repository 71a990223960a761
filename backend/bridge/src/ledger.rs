//! The hosted ledger.
//!
//! One world state lives in memory behind a mutex, seeded from SQLite on
//! startup. Submissions are serialized: each runs on a transaction overlay,
//! its write-set is persisted to SQLite, and only then applied in memory. A
//! rejected invocation or a failed persist leaves both copies untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sla_ledger::{Invocation, Ledger, MemoryStore, SlaLedger};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db;
use crate::errors::Result;
use crate::events::ProcessedEvent;

/// Outcome of a committed submission.
#[derive(Debug, Clone)]
pub struct Committed {
    pub tx_id: String,
    pub response: Vec<u8>,
}

#[derive(Clone)]
pub struct LedgerHandle {
    inner: Arc<Mutex<Ledger<MemoryStore>>>,
    pool: SqlitePool,
}

impl LedgerHandle {
    pub async fn open(pool: SqlitePool, engine: SlaLedger) -> Result<Self> {
        let entries = db::load_world_state(&pool).await?;
        info!("World state loaded: {} keys", entries.len());
        let world = MemoryStore::from_entries(entries);
        Ok(Self {
            inner: Arc::new(Mutex::new(Ledger::new(engine, world))),
            pool,
        })
    }

    /// Submit a transaction by function name and arguments.
    pub async fn submit(&self, function: &str, args: &[String]) -> Result<Committed> {
        self.submit_inner(function, args, None).await
    }

    /// Submit on behalf of a broker record. The record's event row, marked
    /// committed, is stored in the same SQL transaction as the write-set.
    pub async fn submit_recorded(
        &self,
        function: &str,
        args: &[String],
        event: &ProcessedEvent,
    ) -> Result<Committed> {
        self.submit_inner(function, args, Some(event)).await
    }

    async fn submit_inner(
        &self,
        function: &str,
        args: &[String],
        event: Option<&ProcessedEvent>,
    ) -> Result<Committed> {
        let invocation = Invocation::parse(function, args)?;
        let tx_id = tx_id(function, args, Utc::now());
        let event = event.map(|e| e.clone().committed(tx_id.clone()));

        let mut ledger = self.inner.lock().await;
        let prepared = ledger.prepare(&invocation)?;
        if !prepared.write_set.is_empty() || event.is_some() {
            db::persist_write_set(
                &self.pool,
                &tx_id,
                function,
                &prepared.write_set,
                event.as_ref(),
            )
            .await?;
            ledger.commit(&prepared.write_set)?;
        }
        debug!(
            tx_id,
            function,
            writes = prepared.write_set.len(),
            "Transaction committed"
        );

        Ok(Committed {
            tx_id,
            response: prepared.response,
        })
    }

    /// Evaluate a transaction without committing it.
    pub async fn evaluate(&self, function: &str, args: &[String]) -> Result<Vec<u8>> {
        let invocation = Invocation::parse(function, args)?;
        let ledger = self.inner.lock().await;
        Ok(ledger.evaluate(&invocation)?)
    }

    /// Typed read against the committed world state.
    pub async fn query<T>(
        &self,
        read: impl FnOnce(&SlaLedger, &MemoryStore) -> sla_ledger::Result<T>,
    ) -> Result<T> {
        let ledger = self.inner.lock().await;
        Ok(read(ledger.engine(), ledger.world())?)
    }
}

/// Transaction id: hex SHA-256 over the function, its arguments and the
/// submission time.
pub fn tx_id(function: &str, args: &[String], at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(function.as_bytes());
    for arg in args {
        hasher.update([0u8]);
        hasher.update(arg.as_bytes());
    }
    hasher.update(at.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    hex::encode(hasher.finalize())
}
