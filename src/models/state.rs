//! Persisted watcher state.
//!
//! In memory, positions are keyed by an explicit `(list_label, target_id)`
//! pair and alerts by their composite string key. On disk the state is the
//! nested document
//!
//! ```text
//! {
//!   "entries": { "<list_label>": { "<target_id>": { "rank", "page", "shift", "date", "raw", "updated_at" } } },
//!   "alerts":  { "<alert_key>": { "sent_at" } }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{Record, UNRANKED};

/// Identity of a tracked position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey {
    pub list_label: String,
    pub target_id: String,
}

impl PositionKey {
    pub fn new(list_label: impl Into<String>, target_id: impl AsRef<str>) -> Self {
        Self {
            list_label: list_label.into(),
            target_id: target_id.as_ref().to_uppercase(),
        }
    }

    pub fn of(record: &Record) -> Self {
        Self::new(record.list_label.clone(), &record.target_id)
    }
}

/// Most recently observed position of a target on a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    #[serde(default = "unranked")]
    pub rank: u32,

    #[serde(rename = "page", default = "unpaged")]
    pub page_index: usize,

    #[serde(default)]
    pub shift: Option<String>,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(rename = "raw", default)]
    pub raw_text: String,

    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl PositionState {
    pub fn observed(record: &Record, now: DateTime<Utc>) -> Self {
        Self {
            rank: record.rank,
            page_index: record.page_index,
            shift: record.shift.clone(),
            date: record.date.clone(),
            raw_text: record.raw_text.clone(),
            updated_at: now,
        }
    }
}

/// Last delivery of an alert key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub sent_at: DateTime<Utc>,
}

/// Aggregate persisted state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StateDocument", into = "StateDocument")]
pub struct State {
    positions: BTreeMap<PositionKey, PositionState>,
    alerts: BTreeMap<String, AlertRecord>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.alerts.is_empty()
    }

    pub fn position(&self, key: &PositionKey) -> Option<&PositionState> {
        self.positions.get(key)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&PositionKey, &PositionState)> {
        self.positions.iter()
    }

    /// Overwrite the position for the record's key, returning the previous one.
    pub fn record_position(&mut self, record: &Record, now: DateTime<Utc>) -> Option<PositionState> {
        self.positions
            .insert(PositionKey::of(record), PositionState::observed(record, now))
    }

    pub fn alert(&self, key: &str) -> Option<&AlertRecord> {
        self.alerts.get(key)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.len()
    }

    /// True when `key` was never sent or its cooldown has fully elapsed.
    pub fn should_alert(&self, key: &str, cooldown: chrono::Duration, now: DateTime<Utc>) -> bool {
        match self.alerts.get(key) {
            None => true,
            Some(alert) => now - alert.sent_at >= cooldown,
        }
    }

    pub fn record_alert(&mut self, key: impl Into<String>, now: DateTime<Utc>) {
        self.alerts.insert(key.into(), AlertRecord { sent_at: now });
    }
}

/// On-disk layout of [`State`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    entries: BTreeMap<String, BTreeMap<String, PositionState>>,

    #[serde(default)]
    alerts: BTreeMap<String, AlertRecord>,
}

impl From<StateDocument> for State {
    fn from(document: StateDocument) -> Self {
        let positions = document
            .entries
            .into_iter()
            .flat_map(|(label, targets)| {
                targets
                    .into_iter()
                    .map(move |(target, position)| (PositionKey::new(label.clone(), target), position))
            })
            .collect();

        Self {
            positions,
            alerts: document.alerts,
        }
    }
}

impl From<State> for StateDocument {
    fn from(state: State) -> Self {
        let mut entries: BTreeMap<String, BTreeMap<String, PositionState>> = BTreeMap::new();
        for (key, position) in state.positions {
            entries
                .entry(key.list_label)
                .or_default()
                .insert(key.target_id, position);
        }

        Self {
            entries,
            alerts: state.alerts,
        }
    }
}

fn unranked() -> u32 {
    UNRANKED
}

fn unpaged() -> usize {
    UNRANKED as usize
}

/// Accept RFC 3339 or naive ISO-8601 (taken as UTC); anything else becomes now.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp).unwrap_or_else(Utc::now))
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
