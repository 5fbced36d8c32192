//! Phase keyword table for recon-all progress tracking.
//!
//! This module provides:
//! - `PhaseKeyword` describing one recognizable pipeline stage
//! - `PhaseTable`, a validated, ordered, immutable list of keywords
//! - `default_phase_table()` with the canonical recon-all vocabulary
//! - JSON loading for custom tables
//!
//! Targets are offsets from a per-job base progress. The single `finished`
//! entry is the sentinel that always maps to 100 and ends tracking.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::errors::TableError;

/// Highest progress a non-terminal phase can report.
pub const MAX_NON_TERMINAL_PROGRESS: u8 = 99;

/// Stage labels recon-all emits after its `#@#` marker.
///
/// Used to check that a keyword table speaks the pipeline's real vocabulary
/// rather than paraphrases of it. Hemisphere suffixes are kept as emitted.
pub const RECON_ALL_STAGE_LABELS: &[&str] = &[
    "MotionCor",
    "Talairach",
    "Talairach Failure Detection",
    "Nu Intensity Correction",
    "Intensity Normalization",
    "Skull Stripping",
    "EM Registration",
    "CA Normalize",
    "CA Reg",
    "SubCort Seg",
    "CC Seg",
    "Merge ASeg",
    "Intensity Normalization2",
    "Mask BFS",
    "WM Segmentation",
    "Fill",
    "Tessellate lh",
    "Smooth1 lh",
    "Inflation1 lh",
    "QSphere lh",
    "Fix Topology lh",
    "Make White Surf lh",
    "Smooth2 lh",
    "Inflation2 lh",
    "Sphere lh",
    "Surf Reg lh",
    "Jacobian white lh",
    "AvgCurv lh",
    "Cortical Parc lh",
    "Make Pial Surf lh",
    "Cortical ribbon mask",
    "Parcellation Stats lh",
    "Cortical Parc 2 lh",
    "Parcellation Stats 2 lh",
    "Relabel Hypointensities",
    "AParc-to-ASeg aparc",
    "ASeg Stats",
    "WMParc",
    "BA_exvivo Labels lh",
];

/// Where a phase moves job progress when its marker is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseTarget {
    /// `base_progress + offset`, capped below 100
    Offset(u8),
    /// Exactly 100; the job becomes terminal
    Finished,
}

/// One recognizable pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseKeyword {
    /// Lower-cased text expected somewhere in the stage label
    pub match_text: String,
    /// Canonical phase identifier (defaults to `match_text`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Human-readable stage description
    #[serde(default)]
    pub description: String,
    /// Percentage points above the job's base progress
    #[serde(default)]
    pub offset: u8,
    /// Marks the terminal sentinel entry
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub finished: bool,
}

impl PhaseKeyword {
    /// Create a regular stage keyword.
    pub fn new(match_text: &str, offset: u8, description: &str) -> Self {
        Self {
            match_text: match_text.to_string(),
            key: None,
            description: description.to_string(),
            offset,
            finished: false,
        }
    }

    /// Create the terminal sentinel keyword.
    pub fn finished(match_text: &str, description: &str) -> Self {
        Self {
            match_text: match_text.to_string(),
            key: None,
            description: description.to_string(),
            offset: 0,
            finished: true,
        }
    }

    /// Canonical phase identifier.
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.match_text)
    }

    pub fn target(&self) -> PhaseTarget {
        if self.finished {
            PhaseTarget::Finished
        } else {
            PhaseTarget::Offset(self.offset)
        }
    }

    /// Absolute progress this phase reaches for a job started at `base`.
    pub fn target_for(&self, base: u8) -> u8 {
        match self.target() {
            PhaseTarget::Finished => 100,
            PhaseTarget::Offset(offset) => base.saturating_add(offset).min(MAX_NON_TERMINAL_PROGRESS),
        }
    }
}

/// A validated, ordered keyword table.
///
/// Entries are kept in the pipeline's execution order. Construction rejects
/// duplicate keywords, non-increasing offsets and a missing or misplaced
/// `finished` sentinel, so a table that exists is a table that can be used.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTable {
    entries: Vec<PhaseKeyword>,
}

/// On-disk shape of a standalone phase table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTableFile {
    pub phases: Vec<PhaseKeyword>,
}

impl PhaseTable {
    /// Validate and normalize a list of keywords.
    ///
    /// `match_text` and `key` are trimmed and lower-cased before checks run.
    pub fn new(entries: Vec<PhaseKeyword>) -> Result<Self, TableError> {
        if entries.is_empty() {
            return Err(TableError::Empty);
        }

        let mut normalized = Vec::with_capacity(entries.len());
        let mut seen_keywords = HashSet::new();
        let mut seen_keys = HashSet::new();
        let mut previous: Option<(String, u8)> = None;
        let last_index = entries.len() - 1;
        let mut saw_finished = false;

        for (index, mut entry) in entries.into_iter().enumerate() {
            entry.match_text = entry.match_text.trim().to_lowercase();
            if entry.match_text.is_empty() {
                return Err(TableError::EmptyKeyword { index });
            }
            entry.key = entry
                .key
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty());

            if !seen_keywords.insert(entry.match_text.clone()) {
                return Err(TableError::DuplicateKeyword {
                    keyword: entry.match_text,
                });
            }
            if !seen_keys.insert(entry.key().to_string()) {
                return Err(TableError::DuplicateKey {
                    key: entry.key().to_string(),
                });
            }

            match entry.target() {
                PhaseTarget::Finished => {
                    if index != last_index {
                        return Err(TableError::FinishedNotLast {
                            keyword: entry.match_text,
                        });
                    }
                    saw_finished = true;
                }
                PhaseTarget::Offset(offset) => {
                    if offset == 0 || offset > MAX_NON_TERMINAL_PROGRESS {
                        return Err(TableError::TargetOutOfRange {
                            keyword: entry.match_text,
                            offset,
                        });
                    }
                    if let Some((prev_keyword, prev_offset)) = &previous
                        && offset <= *prev_offset
                    {
                        return Err(TableError::NonIncreasingTarget {
                            keyword: entry.match_text,
                            offset,
                            previous: prev_keyword.clone(),
                            previous_offset: *prev_offset,
                        });
                    }
                    previous = Some((entry.match_text.clone(), offset));
                }
            }

            normalized.push(entry);
        }

        if !saw_finished {
            return Err(TableError::MissingFinished);
        }

        Ok(Self {
            entries: normalized,
        })
    }

    /// Load a phase table from a JSON file of the form `{"phases": [...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read phase table: {}", path.display()))?;

        let file: PhaseTableFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse phase table JSON: {}", path.display()))?;

        Self::new(file.phases)
            .with_context(|| format!("Invalid phase table: {}", path.display()))
    }

    /// All entries in execution order.
    pub fn entries(&self) -> &[PhaseKeyword] {
        &self.entries
    }

    /// Look up an entry by canonical key (case-insensitive).
    pub fn get(&self, key: &str) -> Option<&PhaseKeyword> {
        let key = key.trim().to_lowercase();
        self.entries.iter().find(|e| e.key() == key)
    }

    /// The terminal sentinel entry.
    pub fn finished(&self) -> &PhaseKeyword {
        // validated non-empty with the sentinel last
        &self.entries[self.entries.len() - 1]
    }

    /// Regular (non-sentinel) keywords that match none of `labels`.
    ///
    /// An empty result means every stage in the table can actually be
    /// observed in a log using that vocabulary.
    pub fn unmatched_keywords(&self, labels: &[&str]) -> Vec<&PhaseKeyword> {
        let labels: Vec<String> = labels.iter().map(|l| l.trim().to_lowercase()).collect();
        self.entries
            .iter()
            .filter(|e| !e.finished)
            .filter(|e| !labels.iter().any(|l| l.contains(&e.match_text)))
            .collect()
    }

    pub fn to_file(&self) -> PhaseTableFile {
        PhaseTableFile {
            phases: self.entries.clone(),
        }
    }
}

impl Default for PhaseTable {
    fn default() -> Self {
        default_phase_table()
    }
}

/// Canonical keyword list, in recon-all execution order.
pub fn default_phase_keywords() -> Vec<PhaseKeyword> {
    vec![
        PhaseKeyword::new("motioncor", 5, "Motion correction"),
        PhaseKeyword::new("talairach", 10, "Talairach transform"),
        PhaseKeyword::new("intensity normalization", 15, "Intensity normalization"),
        PhaseKeyword::new("skull stripping", 25, "Skull stripping"),
        PhaseKeyword::new("em registration", 35, "EM registration"),
        PhaseKeyword::new("ca normalize", 45, "CA normalize"),
        PhaseKeyword::new("ca reg", 55, "CA registration"),
        PhaseKeyword::new("segmentation", 65, "Segmentation"),
        PhaseKeyword::new("parcellation", 75, "Cortical parcellation"),
        PhaseKeyword::finished("finished", "Finished"),
    ]
}

/// The canonical table.
pub fn default_phase_table() -> PhaseTable {
    PhaseTable {
        entries: default_phase_keywords(),
    }
}
