//! Status classification for result records
//!
//! The backend reports condition as free text. Depending on the model
//! version that is a Korean label (`양호`, `주의`, `불량` ...) or a severity
//! level (`LOW`, `MEDIUM`, `HIGH`). [`classify`] folds all of them into four
//! conditions so the table can badge them consistently.
//!
//! | Condition | Matches (case-insensitive, exact) | Badge |
//! |-----------|-----------------------------------|-------|
//! | Good      | `양호`, `LOW`                     | ✅ 양호 |
//! | Warn      | `주의`, `MID`, `MEDIUM`           | ⚠️ 주의 |
//! | Bad       | `불량`, `손상`, `나쁨`, `HIGH`    | 🚫 불량 |
//! | Unknown   | anything else                     | ℹ️ raw text, or `—` |

use crate::api::ResultRecord;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Good,
    Warn,
    Bad,
    Unknown,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Good => write!(f, "good"),
            Condition::Warn => write!(f, "warn"),
            Condition::Bad => write!(f, "bad"),
            Condition::Unknown => write!(f, "unknown"),
        }
    }
}

/// Display form of a classified status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub condition: Condition,
    pub label: String,
    pub icon: &'static str,
}

struct Rule {
    condition: Condition,
    tokens: &'static [&'static str],
    label: &'static str,
    icon: &'static str,
}

// Order matters: first match wins
const RULES: &[Rule] = &[
    Rule { condition: Condition::Good, tokens: &["양호", "LOW"], label: "양호", icon: "✅" },
    Rule { condition: Condition::Warn, tokens: &["주의", "MID", "MEDIUM"], label: "주의", icon: "⚠️" },
    Rule { condition: Condition::Bad, tokens: &["불량", "손상", "나쁨", "HIGH"], label: "불량", icon: "🚫" },
];

const UNKNOWN_ICON: &str = "ℹ️";
const EMPTY_LABEL: &str = "—";

/// Classify raw status text. Total: every input maps to exactly one badge.
pub fn classify(raw: &str) -> Badge {
    let text = raw.trim();
    let folded = text.to_lowercase();

    for rule in RULES {
        if rule.tokens.iter().any(|t| t.to_lowercase() == folded) {
            return Badge {
                condition: rule.condition,
                label: rule.label.to_string(),
                icon: rule.icon,
            };
        }
    }

    Badge {
        condition: Condition::Unknown,
        label: if text.is_empty() { EMPTY_LABEL.to_string() } else { text.to_string() },
        icon: UNKNOWN_ICON,
    }
}

/// One rendered table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub image_id: String,
    pub raw_status: String,
    pub badge: Badge,
}

impl ResultRow {
    pub fn from_record(record: &ResultRecord) -> Self {
        Self {
            image_id: record.image_id.clone(),
            raw_status: record.status.clone(),
            badge: classify(&record.status),
        }
    }
}

pub fn classify_records(records: &[ResultRecord]) -> Vec<ResultRow> {
    records.iter().map(ResultRow::from_record).collect()
}
