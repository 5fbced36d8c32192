//! Stage marker parsing from recon-all log lines.
//!
//! Extracts the label following the `#@#` marker and resolves it to a phase:
//! - the label is case-folded and trimmed
//! - a keyword matches when it is a substring of the label
//! - among matching keywords the longest one wins

use regex::Regex;
use std::sync::LazyLock;

use super::types::PhaseMatch;
use crate::phase::{PhaseKeyword, PhaseTable, default_phase_table};

// Everything after the first marker on the line
static MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#@#(.*)").unwrap());

static DEFAULT_MATCHER: LazyLock<PhaseMatcher> =
    LazyLock::new(|| PhaseMatcher::new(default_phase_table()));

/// Extract the normalized stage label from a log line.
///
/// Returns `None` when the line has no marker or nothing follows it.
pub fn extract_label(line: &str) -> Option<String> {
    let cap = MARKER_REGEX.captures(line)?;
    let label = cap.get(1)?.as_str().trim().to_lowercase();
    if label.is_empty() { None } else { Some(label) }
}

/// Matches log lines against a keyword table.
#[derive(Debug, Clone)]
pub struct PhaseMatcher {
    table: PhaseTable,
}

impl PhaseMatcher {
    pub fn new(table: PhaseTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PhaseTable {
        &self.table
    }

    /// Resolve a single log line to a phase, if it announces one.
    pub fn match_line(&self, line: &str) -> Option<PhaseMatch> {
        let label = extract_label(line)?;
        let keyword = self.match_label(&label)?;
        tracing::trace!(label = %label, phase = keyword.key(), "Stage marker matched");
        Some(PhaseMatch::new(keyword, label))
    }

    /// Resolve an already-normalized label to the longest matching keyword.
    pub fn match_label(&self, label: &str) -> Option<&PhaseKeyword> {
        self.table
            .entries()
            .iter()
            .filter(|e| label.contains(e.match_text.as_str()))
            .max_by_key(|e| e.match_text.len())
    }
}

impl Default for PhaseMatcher {
    fn default() -> Self {
        Self::new(default_phase_table())
    }
}

/// Convenience function to match a line against the canonical table.
pub fn match_phase(line: &str) -> Option<PhaseMatch> {
    DEFAULT_MATCHER.match_line(line)
}
