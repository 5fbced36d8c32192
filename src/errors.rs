//! Typed error hierarchy for recon-progress.
//!
//! Four enums cover the four places the core can refuse its input:
//! - `TableError` — keyword table rejected at load time
//! - `ThresholdError` — asymmetry bands rejected at load time
//! - `TrackerError` — job lookup and lifecycle failures
//! - `ClassifyError` — volume input validation failures
//!
//! A log line that matches nothing, or a marker that would move progress
//! backwards, is not an error and never shows up here.

use thiserror::Error;

/// Errors from validating a phase keyword table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("Phase table is empty")]
    Empty,

    #[error("Phase entry {index} has an empty match_text")]
    EmptyKeyword { index: usize },

    #[error("Duplicate match_text '{keyword}' in phase table")]
    DuplicateKeyword { keyword: String },

    #[error("Duplicate phase key '{key}' in phase table")]
    DuplicateKey { key: String },

    #[error(
        "Phase '{keyword}' targets offset {offset}, not above the previous phase '{previous}' at {previous_offset}"
    )]
    NonIncreasingTarget {
        keyword: String,
        offset: u8,
        previous: String,
        previous_offset: u8,
    },

    #[error("Phase '{keyword}' targets offset {offset}, expected 1..=99")]
    TargetOutOfRange { keyword: String, offset: u8 },

    #[error("Phase table has no finished entry")]
    MissingFinished,

    #[error("Finished entry '{keyword}' must be the last phase in the table")]
    FinishedNotLast { keyword: String },
}

/// Errors from validating clinical asymmetry bands.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("Threshold {name} must be a finite, non-negative percentage (got {value})")]
    InvalidBound { name: &'static str, value: f64 },

    #[error("normal_max ({normal_max}) must not exceed borderline_max ({borderline_max})")]
    Inverted { normal_max: f64, borderline_max: f64 },
}

/// Errors from the progress tracker.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    #[error("Job '{job_id}' is not being tracked")]
    UnknownJob { job_id: String },

    #[error("Job '{job_id}' is already being tracked")]
    JobAlreadyTracked { job_id: String },

    #[error("Base progress {base} for job '{job_id}' must be below 100")]
    InvalidBaseProgress { job_id: String, base: u8 },

    #[error("Phase '{key}' is not in the keyword table")]
    UnknownPhase { key: String },
}

/// Errors from the asymmetry classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("Invalid {side} volume {value}: volumes must be finite and non-negative")]
    InvalidVolume { side: &'static str, value: f64 },
}
