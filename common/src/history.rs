use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CookingStage, PowerLevel};

/// Start parameters of one cooking session, captured when it begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "durationSeconds")]
    pub duration_secs: u32,
    #[serde(rename = "powerPercent")]
    pub power: PowerLevel,
    pub stage: CookingStage,
}

/// Append-only session log. Insertion order is chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLedger {
    records: Vec<HistoryRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a snapshot, trusting its order.
    pub fn from_records(records: Vec<HistoryRecord>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    /// Oldest first.
    pub fn all(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn newest_first(&self) -> impl Iterator<Item = &HistoryRecord> + '_ {
        self.records.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
