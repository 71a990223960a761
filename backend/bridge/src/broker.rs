//! Kafka REST proxy client: consumer instances, polling and offset commits.
//!
//! Speaks the v2 API of the REST proxy in the binary embedded format: record
//! keys and values travel base64-encoded.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the proxy is unreachable, rate-limits
//!   or answers with a server error, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Client errors (unknown consumer instance, bad request) are returned; the
//!   bridge loop then drops the consumer and creates a fresh one.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::{BridgeError, Result};
use crate::events::BusRecord;

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

const KAFKA_JSON: &str = "application/vnd.kafka.v2+json";
const KAFKA_BINARY: &str = "application/vnd.kafka.binary.v2+json";

/// How long the proxy may hold a records request open, in milliseconds.
const POLL_TIMEOUT_MS: u64 = 1000;

// ─────────────────────────────────────────────────────────
// REST proxy response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConsumerInstance {
    pub instance_id: String,
    pub base_uri: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawRecord {
    pub topic: String,
    /// base64 record key
    #[allow(dead_code)]
    pub key: Option<String>,
    /// base64 record value; `None` for a tombstone
    pub value: Option<String>,
    pub partition: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct OffsetCommit {
    pub topic: String,
    pub partition: i64,
    pub offset: i64,
}

// ─────────────────────────────────────────────────────────
// Consumer
// ─────────────────────────────────────────────────────────

/// A consumer instance registered with the REST proxy.
pub struct Consumer {
    client: Client,
    instance: ConsumerInstance,
}

impl Consumer {
    /// Register a consumer instance in `group` and subscribe it to `topics`.
    pub async fn create(
        client: &Client,
        broker_url: &str,
        group: &str,
        topics: &[String],
    ) -> Result<Self> {
        let name = format!("{group}-{}", std::process::id());
        let body = json!({
            "name": name,
            "format": "binary",
            "auto.offset.reset": "earliest",
            "auto.commit.enable": "false",
        });
        let url = format!("{broker_url}/consumers/{group}");

        let response = send(|| {
            client
                .post(&url)
                .header(CONTENT_TYPE, KAFKA_JSON)
                .body(body.to_string())
        })
        .await?;
        // A leftover instance with the same name from a previous run.
        let instance: ConsumerInstance = if response.status() == StatusCode::CONFLICT {
            ConsumerInstance {
                instance_id: name.clone(),
                base_uri: format!("{url}/instances/{name}"),
            }
        } else {
            checked(response).await?.json().await?
        };

        let consumer = Self {
            client: client.clone(),
            instance,
        };
        consumer.subscribe(topics).await?;
        info!(
            instance = %consumer.instance.instance_id,
            ?topics,
            "Consumer subscribed"
        );
        Ok(consumer)
    }

    async fn subscribe(&self, topics: &[String]) -> Result<()> {
        let url = format!("{}/subscription", self.instance.base_uri);
        let body = json!({ "topics": topics }).to_string();
        let response = send(|| {
            self.client
                .post(&url)
                .header(CONTENT_TYPE, KAFKA_JSON)
                .body(body.clone())
        })
        .await?;
        checked(response).await?;
        Ok(())
    }

    /// Fetch the next batch of records, at most `max_bytes` in total.
    pub async fn poll(&self, max_bytes: usize) -> Result<Vec<RawRecord>> {
        let url = format!(
            "{}/records?timeout={POLL_TIMEOUT_MS}&max_bytes={max_bytes}",
            self.instance.base_uri
        );
        let response = send(|| self.client.get(&url).header(ACCEPT, KAFKA_BINARY)).await?;
        let records: Vec<RawRecord> = checked(response).await?.json().await?;
        debug!("Fetched {} records", records.len());
        Ok(records)
    }

    pub async fn commit(&self, offsets: &[OffsetCommit]) -> Result<()> {
        if offsets.is_empty() {
            return Ok(());
        }
        let url = format!("{}/offsets", self.instance.base_uri);
        let body = json!({ "offsets": offsets }).to_string();
        let response = send(|| {
            self.client
                .post(&url)
                .header(CONTENT_TYPE, KAFKA_JSON)
                .body(body.clone())
        })
        .await?;
        checked(response).await?;
        debug!("Committed offsets for {} partitions", offsets.len());
        Ok(())
    }

    /// Remove the instance from the proxy so the group rebalances promptly.
    pub async fn close(self) -> Result<()> {
        let response = self
            .client
            .delete(&self.instance.base_uri)
            .header(CONTENT_TYPE, KAFKA_JSON)
            .send()
            .await?;
        checked(response).await?;
        info!(instance = %self.instance.instance_id, "Consumer closed");
        Ok(())
    }
}

/// Send a request, retrying transport failures, rate limiting and server
/// errors with exponential back-off.
async fn send<F>(make: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        match make().send().await {
            Err(e) => {
                warn!("Broker request failed (will retry in {backoff}s): {e}");
            }
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                warn!("Rate-limited by broker (will retry in {backoff}s)");
            }
            Ok(resp) if resp.status().is_server_error() => {
                warn!(
                    "Broker server error {} (will retry in {backoff}s)",
                    resp.status()
                );
            }
            Ok(resp) => return Ok(resp),
        }
        tokio::time::sleep(Duration::from_secs(backoff)).await;
        backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
    }
}

/// Turn a non-success status into a [`BridgeError::Broker`] with the proxy's
/// error message.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BridgeError::Broker(format!("{status}: {body}")))
}

// ─────────────────────────────────────────────────────────
// Record decoding
// ─────────────────────────────────────────────────────────

pub fn decode_record(raw: &RawRecord) -> Result<BusRecord> {
    let payload = match &raw.value {
        Some(value) => STANDARD.decode(value)?,
        None => Vec::new(),
    };
    Ok(BusRecord {
        topic: raw.topic.clone(),
        partition: raw.partition,
        offset: raw.offset,
        payload,
    })
}

/// Highest offset seen per topic partition, i.e. the last processed record.
pub fn offsets_to_commit(records: &[RawRecord]) -> Vec<OffsetCommit> {
    let mut latest: BTreeMap<(&str, i64), i64> = BTreeMap::new();
    for record in records {
        let entry = latest
            .entry((record.topic.as_str(), record.partition))
            .or_insert(record.offset);
        *entry = (*entry).max(record.offset);
    }
    latest
        .into_iter()
        .map(|((topic, partition), offset)| OffsetCommit {
            topic: topic.to_string(),
            partition,
            offset,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
