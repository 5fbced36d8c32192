use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cmd;

#[derive(Parser)]
#[command(name = "recon-progress")]
#[command(version, about = "Track recon-all progress from its log and classify volume asymmetry")]
pub struct Cli {
    /// Log matcher and tracker decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to recon-progress.toml. Defaults to ./recon-progress.toml when present.
    #[arg(long, global = true, env = "RECON_PROGRESS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow a recon-all log and report job progress
    Track {
        /// Log file to read; stdin when omitted or "-"
        log: Option<PathBuf>,

        /// Identifier reported for the job
        #[arg(long, default_value = "recon")]
        job_id: String,

        /// Starting progress; overrides the config file and RECON_PROGRESS_BASE
        #[arg(long)]
        base: Option<u8>,

        /// Keep reading as the log grows until the finished marker appears
        #[arg(short, long)]
        follow: bool,

        /// Poll interval in milliseconds while following
        #[arg(long, default_value = "500")]
        poll_ms: u64,

        /// Stop following after this many seconds without new output
        #[arg(long)]
        idle_timeout: Option<u64>,

        /// Emit one JSON state object per progress change
        #[arg(long)]
        json: bool,
    },
    /// Classify left/right volume asymmetry
    Classify {
        /// Left volume (cm^3)
        #[arg(allow_negative_numbers = true)]
        left: f64,

        /// Right volume (cm^3)
        #[arg(allow_negative_numbers = true)]
        right: f64,

        #[arg(long)]
        json: bool,
    },
    /// Classify every structure in a JSON file of left/right volume pairs
    Report {
        /// JSON array of {"structure", "left", "right"} objects
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Show the effective phase keyword table
    Phases {
        /// Base progress used to compute absolute targets
        #[arg(long)]
        base: Option<u8>,

        #[arg(long)]
        json: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any problems
    Validate,
    /// Write a default recon-progress.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let work_dir = std::env::current_dir().context("Failed to get current directory")?;

    match &cli.command {
        Commands::Track {
            log,
            job_id,
            base,
            follow,
            poll_ms,
            idle_timeout,
            json,
        } => {
            let options = cmd::TrackOptions {
                log: log.clone(),
                job_id: job_id.clone(),
                base: *base,
                follow: *follow,
                poll_ms: *poll_ms,
                idle_timeout: *idle_timeout,
                json: *json,
            };
            cmd::cmd_track(&cli, &work_dir, options).await?;
        }
        Commands::Classify { left, right, json } => {
            cmd::cmd_classify(&cli, &work_dir, *left, *right, *json)?
        }
        Commands::Report { file, json } => cmd::cmd_report(&cli, &work_dir, file, *json)?,
        Commands::Phases { base, json } => cmd::cmd_phases(&cli, &work_dir, *base, *json)?,
        Commands::Config { command } => cmd::cmd_config(&cli, &work_dir, command.clone())?,
    }

    Ok(())
}
