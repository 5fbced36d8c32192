//! Match result type for stage markers.

use serde::{Deserialize, Serialize};

use crate::phase::PhaseKeyword;

/// A log line resolved to a phase in the keyword table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMatch {
    /// Canonical phase key (e.g. "motioncor")
    pub key: String,
    /// The keyword text that matched
    pub match_text: String,
    /// Normalized label taken from the line (lower-cased, trimmed)
    pub label: String,
    /// Whether the matched keyword is the terminal sentinel
    #[serde(default)]
    pub finished: bool,
}

impl PhaseMatch {
    pub(crate) fn new(keyword: &PhaseKeyword, label: impl Into<String>) -> Self {
        Self {
            key: keyword.key().to_string(),
            match_text: keyword.match_text.clone(),
            label: label.into(),
            finished: keyword.finished,
        }
    }
}
