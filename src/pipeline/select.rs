//! Best-record selection across the pages of one list.

use std::collections::HashMap;

use crate::models::Record;

/// Reduces a pass's records to one best record per target.
#[derive(Debug, Default)]
pub struct RankSelector {
    best: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RankSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in; see [`Record::outranks`] for the ordering.
    pub fn offer(&mut self, record: Record) {
        match self.index.get(&record.target_id) {
            Some(&slot) => {
                if record.outranks(&self.best[slot]) {
                    self.best[slot] = record;
                }
            }
            None => {
                self.index.insert(record.target_id.clone(), self.best.len());
                self.best.push(record);
            }
        }
    }

    /// Best records in order of first appearance.
    pub fn finish(self) -> Vec<Record> {
        self.best
    }
}

/// Select the best record per target from records in page order.
pub fn select_best(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
    let mut selector = RankSelector::new();
    for record in records {
        selector.offer(record);
    }
    selector.finish()
}
