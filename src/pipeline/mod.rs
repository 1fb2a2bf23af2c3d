//! Monitoring engine.
//!
//! - `paginate`: Walk a list's pages, stopping on repeated content
//! - `parse`: Turn page lines into records
//! - `select`: Keep the best record per target
//! - `diff`: Classify records against persisted positions
//! - `alert`: Tiered, cooldown-gated notifications
//! - `watch`: Pass/sleep orchestration

pub mod alert;
pub mod diff;
pub mod paginate;
pub mod parse;
pub mod select;
pub mod watch;

pub use alert::{AlertDispatcher, AlertOutcome, alert_key};
pub use diff::{Change, ChangeDetector};
pub use paginate::{ListScan, PageWalk, PaginatedFetcher, fingerprint};
pub use parse::RecordParser;
pub use select::{RankSelector, select_best};
pub use watch::{PassSummary, Watcher};
