//! Keyword table listing — `recon-progress phases`.

use anyhow::{Context, Result};
use std::path::Path;

use recon_progress::config::ReconConfig;

use super::super::Cli;

pub fn cmd_phases(cli: &Cli, work_dir: &Path, base: Option<u8>, json: bool) -> Result<()> {
    let config = ReconConfig::resolve(cli.config.as_deref(), work_dir, base)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&config.table.to_file())
                .context("Failed to serialize phase table")?
        );
        return Ok(());
    }

    println!();
    println!("Phase keywords (base progress {})", config.base_progress);
    println!("{}", "=".repeat(56));
    for keyword in config.table.entries() {
        println!(
            "  {:>3}%  {:<26} {}",
            keyword.target_for(config.base_progress),
            keyword.match_text,
            keyword.description
        );
    }
    println!();

    Ok(())
}
