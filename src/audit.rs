//! JSONL audit trail for rebalancing runs.
//!
//! Each run appends events to an audit.jsonl file, one JSON object per
//! line. The ledger holds the recommendation sets themselves; the audit
//! trail records what happened around them (inputs, failures, versions).

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::AllocationDelta;
use crate::error::Result;
use crate::trade::{RecommendationSet, StrategyKind, Trade};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

/// Convenience: log a run start with its requested deltas.
pub fn log_run_started(
    audit: &mut AuditLog,
    owner: &str,
    strategy: StrategyKind,
    deltas: &AllocationDelta,
) -> Result<()> {
    let mut delta_data: Vec<_> = deltas
        .iter()
        .map(|(class, delta)| serde_json::json!({ "asset_class": class, "delta": delta }))
        .collect();
    delta_data.sort_by_key(|v| v["asset_class"].as_str().map(str::to_string));

    audit.log(
        "run_started",
        serde_json::json!({
            "owner": owner,
            "strategy": strategy.number(),
            "deltas": delta_data,
        }),
    )
}

/// Convenience: log a computed trade plan.
pub fn log_plan(audit: &mut AuditLog, trades: &[Trade]) -> Result<()> {
    let trade_data: Vec<_> = trades
        .iter()
        .map(|t| {
            serde_json::json!({
                "ticker": t.ticker,
                "action": format!("{}", t.action),
                "quantity": t.quantity,
                "asset_class": t.asset_class,
                "price": t.price_at_time,
            })
        })
        .collect();

    audit.log("plan_computed", serde_json::json!({ "trades": trade_data }))
}

/// Convenience: log a recorded recommendation set.
pub fn log_recorded(audit: &mut AuditLog, set: &RecommendationSet) -> Result<()> {
    audit.log(
        "recommendation_recorded",
        serde_json::json!({
            "owner": set.owner,
            "strategy": set.strategy.number(),
            "version": set.version,
            "trades": set.trades.len(),
        }),
    )
}

/// Convenience: log a failed run.
pub fn log_run_failed(audit: &mut AuditLog, error: &crate::error::Error) -> Result<()> {
    audit.log(
        "run_failed",
        serde_json::json!({ "error": error.to_string() }),
    )
}
