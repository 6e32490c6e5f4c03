//! Shared primitive types used across every store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable identifier for any record in any store.
pub type EntityId = String;

/// Wall-clock instant attached to records.
pub type Timestamp = DateTime<Utc>;

/// Request verb recorded in the API usage log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `YYYY-MM-DD` display encoding kept next to the timestamp.
pub fn date_string(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS` display encoding kept next to the timestamp.
pub fn time_string(ts: &Timestamp) -> String {
    ts.format("%H:%M:%S").to_string()
}

/// Case-insensitive substring match used by every store's free-text search.
/// `needle` must already be lowercase.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// Round a money amount to cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn display_encodings_match_the_instant() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(date_string(&ts), "2024-03-09");
        assert_eq!(time_string(&ts), "07:05:01");
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(contains_ci("Bank Transfer", "transfer"));
        assert!(!contains_ci("Card", "bank"));
    }
}
