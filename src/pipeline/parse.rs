// src/pipeline/parse.rs

//! Record parsing from extracted text lines.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{Record, UNRANKED};

static RANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3})\b").expect("valid rank regex"));

static SHIFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}[:h]\d{2})\s*[-à]\s*(\d{1,2}[:h]\d{2})").expect("valid shift regex")
});

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|\d{4}/\d{1,2}/\d{1,2})\b")
        .expect("valid date regex")
});

/// Turns page lines into records for the configured targets.
#[derive(Debug, Clone)]
pub struct RecordParser {
    targets: Regex,
}

impl RecordParser {
    /// Build a matcher for `targets` (whole words, case-insensitive).
    pub fn new(targets: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = targets
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Err(AppError::validation("no target identifiers to match"));
        }

        let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
        let targets = Regex::new(&pattern)
            .map_err(|e| AppError::validation(format!("invalid target pattern: {e}")))?;
        Ok(Self { targets })
    }

    /// Parse every line of one page.
    pub fn parse_page(&self, list_label: &str, page_index: usize, lines: &[String]) -> Vec<Record> {
        let records: Vec<Record> = lines
            .iter()
            .flat_map(|line| self.parse_line(list_label, page_index, line))
            .collect();
        debug!(
            list = list_label,
            page = page_index,
            lines = lines.len(),
            records = records.len(),
            "Parsed page"
        );
        records
    }

    /// One record per distinct target found on the line.
    pub fn parse_line(&self, list_label: &str, page_index: usize, line: &str) -> Vec<Record> {
        let line = collapse_whitespace(line);

        let mut seen = HashSet::new();
        let found: Vec<String> = self
            .targets
            .find_iter(&line)
            .map(|m| m.as_str().to_uppercase())
            .filter(|target| seen.insert(target.clone()))
            .collect();
        if found.is_empty() {
            return Vec::new();
        }

        let rank = parse_rank(&line);
        let shift = parse_shift(&line);
        let date = parse_date(&line);

        found
            .into_iter()
            .map(|target_id| Record {
                list_label: list_label.to_string(),
                page_index,
                rank,
                target_id,
                shift: shift.clone(),
                date: date.clone(),
                raw_text: line.clone(),
            })
            .collect()
    }
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First positive 1-3 digit number on the line, else [`UNRANKED`].
pub fn parse_rank(line: &str) -> u32 {
    RANK.captures_iter(line)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .find(|&rank| rank > 0)
        .unwrap_or(UNRANKED)
}

/// Time range as `HH:MM-HH:MM`.
pub fn parse_shift(line: &str) -> Option<String> {
    let caps = SHIFT.captures(line)?;
    Some(format!("{}-{}", normalize_time(&caps[1]), normalize_time(&caps[2])))
}

fn normalize_time(value: &str) -> String {
    let mut parts = value.split([':', 'h']);
    let hour: u32 = parts.next().and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    format!("{hour:02}:{minute:02}")
}

/// First date on the line as `YYYY-MM-DD`; unparseable dates are returned as found.
pub fn parse_date(line: &str) -> Option<String> {
    let value = DATE.captures(line)?.get(1)?.as_str();
    if value.contains('-') {
        return Some(value.to_string());
    }

    let normalized = NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .map(|d| d.format("%Y-%m-%d").to_string());
    match normalized {
        Ok(date) => Some(date),
        Err(_) => {
            debug!(date = value, "Unable to normalize date");
            Some(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> RecordParser {
        RecordParser::new(&["A1234".to_string(), "B5678".to_string()]).unwrap()
    }

    #[test]
    fn test_parse_line_fields() {
        let records = parser().parse_line(
            "Rappel",
            2,
            "  12   a1234  Dupont   14/03/2025   7h00 à 15h30 ",
        );
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.list_label, "Rappel");
        assert_eq!(record.page_index, 2);
        assert_eq!(record.rank, 12);
        assert_eq!(record.target_id, "A1234");
        assert_eq!(record.shift.as_deref(), Some("07:00-15:30"));
        assert_eq!(record.date.as_deref(), Some("2025-03-14"));
        assert_eq!(record.raw_text, "12 a1234 Dupont 14/03/2025 7h00 à 15h30");
    }

    #[test]
    fn test_multiple_targets_share_context() {
        let records = parser().parse_line("Rappel", 0, "3 A1234 B5678 A1234 2025-03-14");
        let targets: Vec<&str> = records.iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(targets, vec!["A1234", "B5678"]);
        assert!(records.iter().all(|r| r.rank == 3));
        assert!(records.iter().all(|r| r.date.as_deref() == Some("2025-03-14")));
    }

    #[test]
    fn test_targets_match_whole_words_only() {
        let p = parser();
        assert!(p.parse_line("Rappel", 0, "1 XA1234 A12345").is_empty());
        assert!(p.parse_line("Rappel", 0, "nothing here").is_empty());
    }

    #[test]
    fn test_rank_defaults_to_unranked() {
        assert_eq!(parse_rank("A1234 absent"), UNRANKED);
        assert_eq!(parse_rank("0 then 42"), 42);
        assert_eq!(parse_rank("1234 A1234"), UNRANKED);
    }

    #[test]
    fn test_shift_formats() {
        assert_eq!(parse_shift("6:00-14:00").as_deref(), Some("06:00-14:00"));
        assert_eq!(parse_shift("22h15 - 6h45").as_deref(), Some("22:15-06:45"));
        assert_eq!(parse_shift("no shift"), None);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_date("le 2025-03-14").as_deref(), Some("2025-03-14"));
        assert_eq!(parse_date("le 4/3/2025").as_deref(), Some("2025-03-04"));
        assert_eq!(parse_date("le 2025/3/4").as_deref(), Some("2025-03-04"));
        assert_eq!(parse_date("le 31/02/2025").as_deref(), Some("31/02/2025"));
        assert_eq!(parse_date("aucune"), None);
    }

    #[test]
    fn test_new_rejects_empty_targets() {
        assert!(RecordParser::new(&[]).is_err());
        assert!(RecordParser::new(&["  ".to_string()]).is_err());
    }
}
