use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalKey;

/// Placeholder for any field extraction could not determine.
pub const UNKNOWN: &str = "unknown";

/// Minute precision, matching what is shown to reviewers.
pub const FOUND_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub company: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub url: CanonicalKey,
    pub found_at: Option<NaiveDateTime>,
}

impl JobRecord {
    /// A record with every field unknown.
    #[cfg(test)]
    pub fn unknown(url: CanonicalKey) -> Self {
        Self {
            company: UNKNOWN.to_string(),
            title: UNKNOWN.to_string(),
            location: UNKNOWN.to_string(),
            description: UNKNOWN.to_string(),
            url,
            found_at: None,
        }
    }

    pub fn has_title(&self) -> bool {
        is_known(&self.title)
    }

    pub fn found_at_display(&self) -> String {
        self.found_at
            .map(|t| t.format(FOUND_AT_FORMAT).to_string())
            .unwrap_or_default()
    }
}

pub fn is_known(value: &str) -> bool {
    !value.is_empty() && value != UNKNOWN
}

pub fn parse_found_at(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), FOUND_AT_FORMAT).ok()
}
