//! Application configuration loaded from environment variables.

use chrono::NaiveTime;
use sla_ledger::config::DEFAULT_STARTING_BALANCE;
use sla_ledger::policy::{
    DEFAULT_DERIVED_MIN, DEFAULT_DERIVED_SPAN, DEFAULT_FLAT_VALUE, DEFAULT_TIERED_VALUE,
    DEFAULT_WEIGHTED_VALUE,
};
use sla_ledger::{AccountMode, Amount, LedgerConfig, PartyMode, PolicyKind, SweepMode};

use crate::errors::{BridgeError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Kafka REST proxy endpoint (e.g. http://localhost:8082)
    pub broker_url: String,
    /// Consumer group the bridge joins
    pub consumer_group: String,
    /// Topic carrying SLA descriptors
    pub sla_topic: String,
    /// Topic carrying violation descriptors
    pub violation_topic: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the broker for new records
    pub poll_interval_secs: u64,
    /// Upper bound for one poll response and for a single record
    pub max_record_bytes: usize,
    /// Identity service used to enroll new users; users get no key without it
    pub identity_endpoint: Option<String>,
    pub identity_org: String,
    /// Balance of users the bridge registers
    pub user_start_balance: Amount,
    /// Daily refund time, UTC
    pub refund_at: NaiveTime,
    pub ledger: LedgerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let refund_at = var("REFUND_AT", "00:00");
        Ok(Config {
            broker_url: var("BROKER_URL", "http://localhost:8082")
                .trim_end_matches('/')
                .to_string(),
            consumer_group: var("CONSUMER_GROUP", "sla-ledger-bridge"),
            sla_topic: var("SLA_TOPIC", "sla_contracts"),
            violation_topic: var("VIOLATION_TOPIC", "sla_violation"),
            database_url: var("DATABASE_URL", "sqlite:./sla_ledger.db"),
            api_port: var("API_PORT", "3001")
                .parse()
                .map_err(|_| BridgeError::Config("Invalid API_PORT".to_string()))?,
            poll_interval_secs: var("POLL_INTERVAL_SECS", "1")
                .parse()
                .map_err(|_| BridgeError::Config("Invalid POLL_INTERVAL_SECS".to_string()))?,
            max_record_bytes: var("MAX_RECORD_BYTES", "1048576")
                .parse()
                .map_err(|_| BridgeError::Config("Invalid MAX_RECORD_BYTES".to_string()))?,
            identity_endpoint: lookup("IDENTITY_ENDPOINT")
                .map(|e| e.trim().trim_end_matches('/').to_string())
                .filter(|e| !e.is_empty()),
            identity_org: var("IDENTITY_ORG", "org1"),
            user_start_balance: amount("USER_START_BALANCE", &var("USER_START_BALANCE", "10000"))?,
            refund_at: NaiveTime::parse_from_str(&refund_at, "%H:%M")
                .map_err(|_| BridgeError::Config(format!("Invalid REFUND_AT {refund_at:?}")))?,
            ledger: ledger_config(&var)?,
        })
    }
}

fn amount(key: &str, raw: &str) -> Result<Amount> {
    raw.trim()
        .parse::<Amount>()
        .map_err(|_| BridgeError::Config(format!("Invalid {key}")))
}

fn flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::Config(format!("Invalid {key}"))),
    }
}

fn ledger_config(var: &dyn Fn(&str, &str) -> String) -> Result<LedgerConfig> {
    let policy = var("COMPENSATION_POLICY", "flat");
    let value = |default: i64| {
        let raw = var("COMPENSATION_VALUE", &default.to_string());
        amount("COMPENSATION_VALUE", &raw)
    };
    let compensation = match policy.as_str() {
        "flat" => PolicyKind::Flat {
            value: value(DEFAULT_FLAT_VALUE)?,
        },
        "derived" => PolicyKind::Derived {
            min: value(DEFAULT_DERIVED_MIN)?,
            span: DEFAULT_DERIVED_SPAN,
        },
        "importance_weighted" => PolicyKind::ImportanceWeighted {
            value: value(DEFAULT_WEIGHTED_VALUE)?,
        },
        "severity_tiered" => PolicyKind::SeverityTiered {
            value: value(DEFAULT_TIERED_VALUE)?,
        },
        other => {
            return Err(BridgeError::Config(format!(
                "Unknown COMPENSATION_POLICY {other:?}"
            )))
        }
    };

    let party_mode = if flag("STRICT_PARTIES", &var("STRICT_PARTIES", "false"))? {
        PartyMode::Strict
    } else {
        PartyMode::AutoCreate {
            starting_balance: Amount::from(DEFAULT_STARTING_BALANCE),
        }
    };
    let account_mode = if flag("STRICT_ACCOUNTS", &var("STRICT_ACCOUNTS", "false"))? {
        AccountMode::Strict
    } else {
        AccountMode::Permissive
    };

    // "off" or 0 disables the provider bootstrap.
    let bootstrap_mint = match var("BOOTSTRAP_MINT", "100").trim() {
        "off" | "none" => None,
        raw => Some(amount("BOOTSTRAP_MINT", raw)?).filter(|a| !a.is_zero()),
    };

    let refund_sweep = match var("REFUND_SWEEP", "abort").as_str() {
        "abort" => SweepMode::Abort,
        "best_effort" => SweepMode::BestEffort,
        other => {
            return Err(BridgeError::Config(format!(
                "Unknown REFUND_SWEEP {other:?}"
            )))
        }
    };

    Ok(LedgerConfig {
        account_mode,
        party_mode,
        bootstrap_mint,
        compensation,
        refund_sweep,
    })
}
