pub mod asymmetry;
pub mod config;
pub mod errors;
pub mod markers;
pub mod phase;
pub mod tracker;

pub use asymmetry::{AsymmetryResult, AsymmetryThresholds, RiskCategory, classify};
pub use markers::{PhaseMatch, PhaseMatcher};
pub use phase::{PhaseKeyword, PhaseTable};
pub use tracker::{JobProgressState, ProgressTracker};
