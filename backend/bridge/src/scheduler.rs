//! Daily refund sweep.
//!
//! Submits `RefundAllSLAs` once a day at the configured UTC time.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::errors::Result;
use crate::ledger::LedgerHandle;

/// First instant strictly after `now` at `at` o'clock UTC.
pub fn next_run(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Run one sweep and return its transaction id and report.
pub async fn sweep(ledger: &LedgerHandle) -> Result<(String, Value)> {
    let committed = ledger.submit("RefundAllSLAs", &[]).await?;
    let report: Value = serde_json::from_slice(&committed.response)?;
    let count = |field: &str| report[field].as_array().map_or(0, Vec::len);
    info!(
        tx_id = %committed.tx_id,
        refunded = count("refunded"),
        skipped = count("skipped"),
        failed = count("failed"),
        "Refund sweep committed"
    );
    Ok((committed.tx_id, report))
}

pub async fn run(ledger: LedgerHandle, at: NaiveTime, shutdown: CancellationToken) {
    loop {
        let now = Utc::now();
        let next = next_run(now, at);
        info!("Next refund sweep at {next}");
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        if let Err(e) = sweep(&ledger).await {
            error!("Refund sweep failed: {e}");
        }
    }
    info!("Refund scheduler stopped");
}
