//! Report generation for fetched results
//!
//! - **HTML**: standalone page with the badge table
//! - **JSON**: machine-readable format for programmatic consumption
//! - **CSV**: spreadsheet-compatible format
//!
//! # Usage
//!
//! ```ignore
//! use turfcheck::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.html", &rows)?;  // HTML
//! report::generate("report.json", &rows)?;  // JSON
//! report::generate("report.csv", &rows)?;   // CSV
//! ```

pub mod csv;
pub mod html;
pub mod json;

use crate::status::{Condition, ResultRow};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, rows: &[ResultRow]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, rows),
        "json" => json::write(&mut file, rows),
        _ => csv::write(&mut file, rows),
    }
}

/// Row counts per condition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub good: usize,
    pub warn: usize,
    pub bad: usize,
    pub unknown: usize,
}

impl Summary {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };

        for r in rows {
            match r.badge.condition {
                Condition::Good => summary.good += 1,
                Condition::Warn => summary.warn += 1,
                Condition::Bad => summary.bad += 1,
                Condition::Unknown => summary.unknown += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::classify;

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================

    fn create_test_row(id: &str, status: &str) -> ResultRow {
        ResultRow {
            image_id: id.to_string(),
            raw_status: status.to_string(),
            badge: classify(status),
        }
    }

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_rows(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_summary_mixed() {
        let rows = vec![
            create_test_row("a", "양호"),
            create_test_row("b", "LOW"),
            create_test_row("c", "주의"),
            create_test_row("d", "HIGH"),
            create_test_row("e", "pending"),
        ];
        let summary = Summary::from_rows(&rows);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.good, 2);
        assert_eq!(summary.warn, 1);
        assert_eq!(summary.bad, 1);
        assert_eq!(summary.unknown, 1);
    }

    // ==========================================================================
    // FORMAT DISPATCH TESTS
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![create_test_row("a1", "양호")];

        let json_path = dir.path().join("out.json");
        generate(&json_path, &rows).unwrap();
        let json_text = std::fs::read_to_string(&json_path).unwrap();
        assert!(json_text.trim_start().starts_with('{'));

        let html_path = dir.path().join("out.HTML");
        generate(&html_path, &rows).unwrap();
        assert!(std::fs::read_to_string(&html_path).unwrap().starts_with("<!DOCTYPE html>"));

        let csv_path = dir.path().join("out.txt");
        generate(&csv_path, &rows).unwrap();
        assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with("image_id,"));
    }
}
