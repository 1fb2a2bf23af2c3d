//! Records extracted from list pages.

use std::fmt;

/// Rank used when a line carries no usable number; sorts after everything.
pub const UNRANKED: u32 = 9999;

/// One sighting of a target on a list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Label of the list the page belongs to
    pub list_label: String,

    /// Zero-based page index
    pub page_index: usize,

    /// Position on the list; lower is more urgent
    pub rank: u32,

    /// Uppercased target identifier
    pub target_id: String,

    /// Normalized `HH:MM-HH:MM`
    pub shift: Option<String>,

    /// Normalized `YYYY-MM-DD` when parseable
    pub date: Option<String>,

    /// Whitespace-collapsed source line
    pub raw_text: String,
}

impl Record {
    /// True when this record should replace `current` as the best sighting.
    ///
    /// Lower rank wins; on equal rank the lower page wins; full ties keep
    /// the record seen first.
    pub fn outranks(&self, current: &Record) -> bool {
        self.rank < current.rank
            || (self.rank == current.rank && self.page_index < current.page_index)
    }
}

/// Payload kind, resolved once from the response content-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Pdf,
    Html,
    Unknown,
}

impl ContentKind {
    /// Resolve from a raw `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Self {
        match normalize_content_type(content_type).as_str() {
            "application/pdf" => Self::Pdf,
            "text/html" | "application/xhtml+xml" => Self::Html,
            _ => Self::Unknown,
        }
    }
}

/// Lowercased media type without parameters (`text/html; charset=utf-8` → `text/html`).
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}

/// Alert importance, derived from rank thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Top,
    Warn,
    Update,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Top => "top",
            Tier::Warn => "warn",
            Tier::Update => "update",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: u32, page_index: usize) -> Record {
        Record {
            list_label: "Rappel".into(),
            page_index,
            rank,
            target_id: "A1234".into(),
            shift: None,
            date: None,
            raw_text: String::new(),
        }
    }

    #[test]
    fn test_outranks() {
        assert!(record(3, 4).outranks(&record(5, 0)));
        assert!(record(5, 0).outranks(&record(5, 1)));
        assert!(!record(5, 1).outranks(&record(5, 1)));
        assert!(!record(5, 2).outranks(&record(5, 1)));
        assert!(!record(6, 0).outranks(&record(5, 9)));
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(ContentKind::from_content_type("application/pdf"), ContentKind::Pdf);
        assert_eq!(
            ContentKind::from_content_type("Text/HTML; charset=UTF-8"),
            ContentKind::Html
        );
        assert_eq!(
            ContentKind::from_content_type("application/xhtml+xml"),
            ContentKind::Html
        );
        assert_eq!(ContentKind::from_content_type(""), ContentKind::Unknown);
        assert_eq!(ContentKind::from_content_type("text/plain"), ContentKind::Unknown);
    }
}
