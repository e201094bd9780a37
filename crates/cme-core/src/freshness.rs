//! Freshness rules: whether a freshly observed table supersedes stored rows.
//!
//! Settlements carry a publication timestamp; volume/OI tables carry a
//! preliminary/final flag. Both reduce to three states per
//! (asset, trade date):
//!
//! | State              | Action          |
//! |--------------------|-----------------|
//! | `Absent`           | `Insert`        |
//! | `StalePreliminary` | `UpdateInPlace` |
//! | `Current`          | `Skip`          |
//!
//! A stored final volume/OI row is never overwritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Staleness signal read from a table page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessSignal {
    /// Settlements: publication time, already normalised to UTC.
    LastUpdated(DateTime<Utc>),
    /// Volume/OI: `true` once the exchange marks the data final.
    Finality(bool),
}

/// Stored state relative to an observed signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FreshnessState {
    Absent,
    StalePreliminary,
    Current,
}

/// What to do with the observed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessAction {
    Insert,
    UpdateInPlace,
    Skip,
}

impl FreshnessState {
    /// Settlement state: stale iff the observed timestamp is strictly newer,
    /// compared at millisecond precision.
    pub fn for_settlement(persisted: Option<DateTime<Utc>>, observed: DateTime<Utc>) -> Self {
        match persisted {
            None => FreshnessState::Absent,
            Some(stored) if stored.timestamp_millis() < observed.timestamp_millis() => {
                FreshnessState::StalePreliminary
            }
            Some(_) => FreshnessState::Current,
        }
    }

    /// Volume/OI state: stale only on the preliminary -> final transition.
    pub fn for_volume_oi(persisted_final: Option<bool>, observed_final: bool) -> Self {
        match persisted_final {
            None => FreshnessState::Absent,
            Some(false) if observed_final => FreshnessState::StalePreliminary,
            Some(_) => FreshnessState::Current,
        }
    }

    pub fn action(self) -> FreshnessAction {
        match self {
            FreshnessState::Absent => FreshnessAction::Insert,
            FreshnessState::StalePreliminary => FreshnessAction::UpdateInPlace,
            FreshnessState::Current => FreshnessAction::Skip,
        }
    }
}

impl FreshnessAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessAction::Insert => "insert",
            FreshnessAction::UpdateInPlace => "update",
            FreshnessAction::Skip => "skip",
        }
    }
}

impl fmt::Display for FreshnessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FreshnessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessSignal::LastUpdated(ts) => write!(f, "last_updated={}", ts.to_rfc3339()),
            FreshnessSignal::Finality(true) => f.write_str("final"),
            FreshnessSignal::Finality(false) => f.write_str("preliminary"),
        }
    }
}
