//! Database layer: migrations, world-state persistence and the event log.

use std::str::FromStr;

use sla_ledger::WriteSet;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use crate::errors::Result;
use crate::events::{EventRecord, ProcessedEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// World state
// ─────────────────────────────────────────────────────────

/// Every committed key, for seeding the in-memory world state on startup.
pub async fn load_world_state(pool: &SqlitePool) -> Result<Vec<(String, Vec<u8>)>> {
    let rows: Vec<(String, Vec<u8>)> =
        sqlx::query_as("SELECT key, value FROM world_state ORDER BY key")
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

/// Persist a write-set in a single SQL transaction, together with the
/// broker record that caused it when there is one.
pub async fn persist_write_set(
    pool: &SqlitePool,
    tx_id: &str,
    function: &str,
    write_set: &WriteSet,
    event: Option<&ProcessedEvent>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (key, value) in write_set.iter() {
        match value {
            Some(bytes) => {
                sqlx::query(
                    r#"
                    INSERT INTO world_state (key, value, tx_id)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT (key) DO UPDATE
                        SET value = excluded.value,
                            tx_id = excluded.tx_id,
                            updated_at = strftime('%s', 'now')
                    "#,
                )
                .bind(key)
                .bind(bytes)
                .bind(tx_id)
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM world_state WHERE key = ?1")
                    .bind(key)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    sqlx::query("INSERT INTO ledger_transactions (tx_id, function, writes) VALUES (?1, ?2, ?3)")
        .bind(tx_id)
        .bind(function)
        .bind(write_set.len() as i64)
        .execute(&mut *tx)
        .await?;

    if let Some(event) = event {
        insert_event(&mut *tx, event).await?;
    }

    tx.commit().await?;
    debug!(tx_id, function, writes = write_set.len(), "write-set persisted");
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Event log
// ─────────────────────────────────────────────────────────

/// Whether a broker record was already processed. Records are redelivered
/// when the bridge stops between processing and the offset commit.
pub async fn event_seen(
    pool: &SqlitePool,
    topic: &str,
    partition: i64,
    offset: i64,
) -> Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM events WHERE topic = ?1 AND record_partition = ?2 AND record_offset = ?3",
    )
    .bind(topic)
    .bind(partition)
    .bind(offset)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Store a processed event. A record seen before is silently ignored.
pub async fn insert_event<'e>(
    executor: impl SqliteExecutor<'e>,
    event: &ProcessedEvent,
) -> Result<bool> {
    let rows_affected = sqlx::query(
        r#"
        INSERT OR IGNORE INTO events
            (topic, record_partition, record_offset, event_type, contract_id,
             outcome, error_kind, error, tx_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&event.topic)
    .bind(event.partition)
    .bind(event.offset)
    .bind(event.kind.as_str())
    .bind(&event.contract_id)
    .bind(event.outcome.as_str())
    .bind(&event.error_kind)
    .bind(&event.error)
    .bind(&event.tx_id)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(rows_affected > 0)
}

/// Fetch all events for a given contract, oldest first.
pub async fn get_events_for_contract(
    pool: &SqlitePool,
    contract_id: &str,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, topic, record_partition, record_offset, event_type, contract_id,
               outcome, error_kind, error, tx_id, created_at
        FROM   events
        WHERE  contract_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, oldest first.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, topic, record_partition, record_offset, event_type, contract_id,
               outcome, error_kind, error, tx_id, created_at
        FROM   events
        ORDER  BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
