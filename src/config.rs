//! Configuration for recon-progress.
//!
//! Settings are read from `recon-progress.toml` and layered
//! file → environment → CLI. Every section is optional; anything left out
//! falls back to the canonical recon-all table and clinical bands.
//!
//! # Configuration File Format
//!
//! ```toml
//! [tracking]
//! base_progress = 0
//!
//! [[phases]]
//! match_text = "motioncor"
//! offset = 5
//! description = "Motion correction"
//!
//! [[phases]]
//! match_text = "finished"
//! finished = true
//!
//! [asymmetry]
//! normal_max = 8.0
//! borderline_max = 12.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::asymmetry::AsymmetryThresholds;
use crate::errors::TableError;
use crate::phase::{PhaseKeyword, PhaseTable, RECON_ALL_STAGE_LABELS, default_phase_keywords};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "recon-progress.toml";

/// Environment variable overriding `tracking.base_progress`.
pub const BASE_PROGRESS_ENV: &str = "RECON_PROGRESS_BASE";

/// Tracking defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackingSection {
    /// Progress a job starts at; phase offsets are added to it
    #[serde(default)]
    pub base_progress: u8,
}

/// Root of `recon-progress.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconToml {
    #[serde(default)]
    pub tracking: TrackingSection,
    /// Custom keyword table; empty means the canonical one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phases: Vec<PhaseKeyword>,
    #[serde(default)]
    pub asymmetry: AsymmetryThresholds,
}

impl ReconToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("In config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse recon-progress.toml")
    }

    /// A fully spelled-out default configuration, suitable for editing.
    pub fn with_defaults() -> Self {
        Self {
            phases: default_phase_keywords(),
            ..Self::default()
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize recon-progress.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Build the keyword table this configuration describes.
    pub fn phase_table(&self) -> Result<PhaseTable, TableError> {
        if self.phases.is_empty() {
            Ok(PhaseTable::default())
        } else {
            PhaseTable::new(self.phases.clone())
        }
    }

    /// Base progress, with the environment overriding the file.
    pub fn base_progress(&self) -> Result<u8> {
        match std::env::var(BASE_PROGRESS_ENV) {
            Ok(value) => value
                .trim()
                .parse::<u8>()
                .with_context(|| format!("Invalid {}='{}'", BASE_PROGRESS_ENV, value)),
            Err(_) => Ok(self.tracking.base_progress),
        }
    }

    /// Validate the configuration and return any problems found.
    ///
    /// Hard errors (an unusable table or bands) and vocabulary warnings are
    /// both reported; only the former make `ReconConfig::resolve` fail.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.tracking.base_progress >= 100 {
            problems.push(format!(
                "tracking.base_progress = {} must be below 100",
                self.tracking.base_progress
            ));
        }

        match self.phase_table() {
            Ok(table) => {
                for keyword in table.unmatched_keywords(RECON_ALL_STAGE_LABELS) {
                    problems.push(format!(
                        "Phase '{}' matches no known recon-all stage label; progress will never reach it",
                        keyword.match_text
                    ));
                }
            }
            Err(e) => problems.push(format!("Invalid phase table: {}", e)),
        }

        if let Err(e) = self.asymmetry.validate() {
            problems.push(format!("Invalid asymmetry thresholds: {}", e));
        }

        problems
    }
}

/// Effective settings after applying file, environment and CLI layers.
#[derive(Debug, Clone)]
pub struct ReconConfig {
    /// File the settings came from, if any
    pub source: Option<PathBuf>,
    pub table: PhaseTable,
    pub base_progress: u8,
    pub thresholds: AsymmetryThresholds,
}

impl ReconConfig {
    /// Resolve configuration.
    ///
    /// An explicit `path` must exist. Without one, `recon-progress.toml` in
    /// `dir` is used when present, otherwise defaults. `base_override` (from
    /// the command line) wins over both file and environment.
    pub fn resolve(path: Option<&Path>, dir: &Path, base_override: Option<u8>) -> Result<Self> {
        let (toml, source) = match path {
            Some(p) => (ReconToml::load(p)?, Some(p.to_path_buf())),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.exists() {
                    (ReconToml::load(&candidate)?, Some(candidate))
                } else {
                    (ReconToml::default(), None)
                }
            }
        };

        let table = toml.phase_table().context("Invalid phase table in configuration")?;
        toml.asymmetry
            .validate()
            .context("Invalid asymmetry thresholds in configuration")?;

        let base_progress = match base_override {
            Some(base) => base,
            None => toml.base_progress()?,
        };
        if base_progress >= 100 {
            anyhow::bail!("Base progress {} must be below 100", base_progress);
        }

        tracing::debug!(
            source = ?source,
            phases = table.entries().len(),
            base_progress,
            "Resolved configuration"
        );

        Ok(Self {
            source,
            table,
            base_progress,
            thresholds: toml.asymmetry,
        })
    }
}
