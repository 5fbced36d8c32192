//! Per-job progress state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::PhaseKeyword;

/// Progress of a single recon-all job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgressState {
    pub job_id: String,
    /// Offset every phase target is measured from
    pub base_progress: u8,
    /// Current percentage, 0-100, never decreasing
    pub current_progress: u8,
    /// Key of the phase that last moved progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_matched_phase: Option<String>,
    /// Description of the phase that last moved progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_description: Option<String>,
    pub updated_at: DateTime<Utc>,
    /// True once `finished` was observed or the job was marked done
    pub terminal: bool,
}

/// What applying a phase did to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Progress moved forward
    Advanced { from: u8, to: u8 },
    /// The terminal sentinel was applied
    Finished { from: u8 },
    /// Target was at or below current progress; nothing changed
    Suppressed { target: u8 },
    /// The job had already finished; nothing changed
    AlreadyTerminal,
}

impl ProgressUpdate {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Finished { .. })
    }
}

impl JobProgressState {
    pub fn new(job_id: impl Into<String>, base_progress: u8) -> Self {
        Self {
            job_id: job_id.into(),
            base_progress,
            current_progress: base_progress,
            last_matched_phase: None,
            stage_description: None,
            updated_at: Utc::now(),
            terminal: false,
        }
    }

    /// Apply a matched phase, keeping progress monotonic.
    pub fn apply(&mut self, keyword: &PhaseKeyword) -> ProgressUpdate {
        if self.terminal {
            return ProgressUpdate::AlreadyTerminal;
        }

        if keyword.finished {
            let from = self.current_progress;
            self.record(keyword, 100);
            self.terminal = true;
            return ProgressUpdate::Finished { from };
        }

        let target = keyword.target_for(self.base_progress);
        if target <= self.current_progress {
            return ProgressUpdate::Suppressed { target };
        }

        let from = self.current_progress;
        self.record(keyword, target);
        ProgressUpdate::Advanced { from, to: target }
    }

    /// Mark the job done without having seen the sentinel marker.
    pub fn mark_terminal(&mut self) {
        self.current_progress = 100;
        self.terminal = true;
        self.updated_at = Utc::now();
    }

    fn record(&mut self, keyword: &PhaseKeyword, progress: u8) {
        self.current_progress = progress;
        self.last_matched_phase = Some(keyword.key().to_string());
        self.stage_description = if keyword.description.is_empty() {
            None
        } else {
            Some(keyword.description.clone())
        };
        self.updated_at = Utc::now();
    }

    /// One-line status for display.
    pub fn summary(&self) -> String {
        let stage = self
            .stage_description
            .as_deref()
            .or(self.last_matched_phase.as_deref())
            .unwrap_or("waiting for first stage");
        format!(
            "{}: {}% ({}){}",
            self.job_id,
            self.current_progress,
            stage,
            if self.terminal { " [done]" } else { "" }
        )
    }
}
