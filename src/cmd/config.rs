//! Configuration view and validation commands — `recon-progress config`.

use anyhow::Result;
use std::path::Path;

use recon_progress::config::{DEFAULT_CONFIG_FILE, ReconToml};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, work_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| work_dir.join(DEFAULT_CONFIG_FILE));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("recon-progress configuration");
            println!("============================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                ReconToml::load(&config_path)?
            } else {
                println!("No config file at {}; using defaults.", config_path.display());
                ReconToml::default()
            };
            println!();

            println!("[tracking]");
            println!("  base_progress = {}", toml.tracking.base_progress);
            println!();

            println!("[asymmetry]");
            println!("  normal_max = {}", toml.asymmetry.normal_max);
            println!("  borderline_max = {}", toml.asymmetry.borderline_max);
            println!();

            if toml.phases.is_empty() {
                println!("[[phases]] canonical recon-all table");
            } else {
                println!("[[phases]] {} custom entries", toml.phases.len());
            }
            println!();

            println!("Effective values (with env overrides):");
            println!("  base_progress = {}", toml.base_progress()?);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No config file found. Using defaults (valid).");
                return Ok(());
            }

            let toml = ReconToml::load(&config_path)?;
            let problems = toml.validate();

            if problems.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration problems:");
                for problem in &problems {
                    println!("  - {}", problem);
                }
            }
            println!();

            if toml.phase_table().is_err() || toml.asymmetry.validate().is_err() {
                anyhow::bail!("Configuration is not usable: {}", config_path.display());
            }
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                println!(
                    "{} already exists. Use --force to overwrite.",
                    config_path.display()
                );
                return Ok(());
            }

            ReconToml::with_defaults().save(&config_path)?;
            println!("Wrote {}", config_path.display());
        }
    }

    Ok(())
}
