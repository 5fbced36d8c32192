//! Asymmetry commands — `recon-progress classify` and `recon-progress report`.

use anyhow::{Context, Result};
use std::path::Path;

use recon_progress::asymmetry::{AsymmetryResult, Dominance, VolumePair, classify_pairs};
use recon_progress::config::ReconConfig;

use super::super::Cli;

pub fn cmd_classify(cli: &Cli, work_dir: &Path, left: f64, right: f64, json: bool) -> Result<()> {
    let config = ReconConfig::resolve(cli.config.as_deref(), work_dir, None)?;
    let result = config.thresholds.classify(left, right)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        println!("Left volume:      {} cm3", result.left_volume);
        println!("Right volume:     {} cm3", result.right_volume);
        println!(
            "Asymmetry index:  {:.2}% ({})",
            result.asymmetry_index_percent,
            dominance_label(&result)
        );
        println!("Category:         {}", result.category);
    }

    Ok(())
}

pub fn cmd_report(cli: &Cli, work_dir: &Path, file: &Path, json: bool) -> Result<()> {
    let config = ReconConfig::resolve(cli.config.as_deref(), work_dir, None)?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read volumes file: {}", file.display()))?;
    let pairs: Vec<VolumePair> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse volumes JSON: {}", file.display()))?;

    let results = classify_pairs(&pairs, &config.thresholds)
        .with_context(|| format!("Invalid volumes in {}", file.display()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).context("Failed to serialize report")?
        );
        return Ok(());
    }

    println!();
    println!("{:<24} {:>10} {:>10} {:>9}  Category", "Structure", "Left", "Right", "AI %");
    println!("{}", "-".repeat(68));
    for result in &results {
        println!(
            "{:<24} {:>10.3} {:>10.3} {:>9.2}  {}",
            result.structure.as_deref().unwrap_or("-"),
            result.left_volume,
            result.right_volume,
            result.asymmetry_index_percent,
            result.category
        );
    }
    println!();

    Ok(())
}

fn dominance_label(result: &AsymmetryResult) -> &'static str {
    match result.dominance() {
        Dominance::Left => "left-dominant",
        Dominance::Right => "right-dominant",
        Dominance::Symmetric => "symmetric",
    }
}
