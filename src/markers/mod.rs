//! Stage marker recognition for recon-all logs.
//!
//! recon-all announces each stage with a line like:
//!
//! - `#@# MotionCor Wed Mar  8 10:02:11 UTC 2023`
//! - `#@# Talairach Failure Detection Wed Mar  8 10:20:45 UTC 2023`
//!
//! The text after `#@#` is the stage label. This module extracts it and
//! resolves it against a `PhaseTable` by longest substring match. Every
//! other line is informational chatter and simply does not match.

mod parser;
mod types;

pub use parser::{PhaseMatcher, extract_label, match_phase};
pub use types::PhaseMatch;
