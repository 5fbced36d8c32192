//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled      |
//! |------------|-----------------------|
//! | `track`    | `Track`               |
//! | `classify` | `Classify`, `Report`  |
//! | `phase`    | `Phases`              |
//! | `config`   | `Config`              |

pub mod classify;
pub mod config;
pub mod phase;
pub mod track;

pub use classify::{cmd_classify, cmd_report};
pub use config::cmd_config;
pub use phase::cmd_phases;
pub use track::{TrackOptions, cmd_track};
