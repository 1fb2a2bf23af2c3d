//! Change detection against persisted positions.
//!
//! Compares the best record of the current pass with the last observed
//! position of the same target and classifies the transition. The stored
//! position is always replaced by the current observation, whatever the
//! outcome.
//!
//! Only improvements (lower rank or page) and shift/date differences count
//! as changes; a target sliding down the list is reported as unchanged.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{PositionState, Record, State};

/// Transition of one target between two passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// First sighting on this list
    New,
    /// Improved, or shift/date differ
    Changed { previous: PositionState },
    Unchanged,
}

impl Change {
    /// Whether this transition may produce an alert.
    pub fn is_alertable(&self) -> bool {
        !matches!(self, Change::Unchanged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Change::New => "new",
            Change::Changed { .. } => "changed",
            Change::Unchanged => "unchanged",
        }
    }
}

/// Classifier for best records against state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Classify `record` against `previous` without touching state.
    pub fn classify(&self, previous: Option<&PositionState>, record: &Record) -> Change {
        let Some(previous) = previous else {
            return Change::New;
        };

        let improved = record.rank < previous.rank || record.page_index < previous.page_index;
        let moved = record.shift != previous.shift || record.date != previous.date;

        if improved || moved {
            Change::Changed {
                previous: previous.clone(),
            }
        } else {
            Change::Unchanged
        }
    }

    /// Classify `record` and store it as the target's current position.
    pub fn detect(&self, state: &mut State, record: &Record, now: DateTime<Utc>) -> Change {
        let previous = state.record_position(record, now);
        let change = self.classify(previous.as_ref(), record);

        match &change {
            Change::New => info!(
                list = %record.list_label,
                target = %record.target_id,
                rank = record.rank,
                page = record.page_index,
                "New entry"
            ),
            Change::Changed { previous } => info!(
                list = %record.list_label,
                target = %record.target_id,
                was_rank = previous.rank,
                was_page = previous.page_index,
                rank = record.rank,
                page = record.page_index,
                "Entry changed"
            ),
            Change::Unchanged => debug!(
                list = %record.list_label,
                target = %record.target_id,
                rank = record.rank,
                "No change"
            ),
        }

        change
    }
}
