//! Log tracking command — `recon-progress track`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use recon_progress::config::ReconConfig;
use recon_progress::tracker::{JobProgressState, ProgressTracker};

use super::super::Cli;

/// Arguments of the `track` subcommand.
pub struct TrackOptions {
    pub log: Option<PathBuf>,
    pub job_id: String,
    pub base: Option<u8>,
    pub follow: bool,
    pub poll_ms: u64,
    pub idle_timeout: Option<u64>,
    pub json: bool,
}

/// How to behave when the reader hits end of input.
struct FollowPolicy {
    enabled: bool,
    poll: Duration,
    idle_timeout: Option<Duration>,
}

pub async fn cmd_track(cli: &Cli, work_dir: &Path, options: TrackOptions) -> Result<()> {
    let config = ReconConfig::resolve(cli.config.as_deref(), work_dir, options.base)?;
    let tracker = ProgressTracker::new(config.table);
    let initial = tracker.start_job(options.job_id.as_str(), config.base_progress)?;
    report(&initial, options.json)?;

    let final_state = match options.log.as_deref() {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let policy = FollowPolicy {
                enabled: options.follow,
                poll: Duration::from_millis(options.poll_ms.max(10)),
                idle_timeout: options.idle_timeout.map(Duration::from_secs),
            };
            feed_lines(BufReader::new(file), &tracker, &options.job_id, &policy, options.json)
                .await?
        }
        _ => {
            // stdin ends when the writer closes it, so there is nothing to follow
            let policy = FollowPolicy {
                enabled: false,
                poll: Duration::ZERO,
                idle_timeout: None,
            };
            let reader = BufReader::new(tokio::io::stdin());
            feed_lines(reader, &tracker, &options.job_id, &policy, options.json).await?
        }
    };

    if !final_state.terminal {
        tracing::warn!(
            job_id = %final_state.job_id,
            progress = final_state.current_progress,
            "Log ended before the finished marker"
        );
    }

    if !options.json {
        println!("{}", final_state.summary());
    }

    Ok(())
}

/// Feed every complete line from `reader` to the tracker, printing each
/// progress change. Returns the job's state once input is exhausted.
async fn feed_lines<R>(
    mut reader: R,
    tracker: &ProgressTracker,
    job_id: &str,
    policy: &FollowPolicy,
    json: bool,
) -> Result<JobProgressState>
where
    R: AsyncBufRead + Unpin,
{
    let mut pending: Vec<u8> = Vec::new();
    let mut last_activity = Instant::now();
    let mut state = tracker.current_state(job_id)?;

    loop {
        let read = reader
            .read_until(b'\n', &mut pending)
            .await
            .context("Failed to read log line")?;

        let complete = pending.last() == Some(&b'\n');
        if read == 0 || !complete {
            // End of input, possibly in the middle of a line
            if !policy.enabled {
                if !pending.is_empty() {
                    state = ingest(tracker, job_id, &pending, &state, json)?;
                }
                return Ok(state);
            }
            if read > 0 {
                last_activity = Instant::now();
            } else if finishes_job(tracker, &pending) {
                // The writer may never add the newline after its last marker
                return ingest(tracker, job_id, &pending, &state, json);
            }
            if let Some(limit) = policy.idle_timeout
                && last_activity.elapsed() >= limit
            {
                tracing::info!(job_id = %job_id, "No new log output, stopped following");
                if !pending.is_empty() {
                    state = ingest(tracker, job_id, &pending, &state, json)?;
                }
                return Ok(state);
            }
            tokio::time::sleep(policy.poll).await;
            continue;
        }

        last_activity = Instant::now();
        state = ingest(tracker, job_id, &pending, &state, json)?;
        pending.clear();

        if state.terminal {
            return Ok(state);
        }
    }
}

/// Whether a buffered, newline-less line is the terminal marker.
fn finishes_job(tracker: &ProgressTracker, raw: &[u8]) -> bool {
    !raw.is_empty()
        && tracker
            .matcher()
            .match_line(&String::from_utf8_lossy(raw))
            .is_some_and(|matched| matched.finished)
}

fn ingest(
    tracker: &ProgressTracker,
    job_id: &str,
    raw: &[u8],
    previous: &JobProgressState,
    json: bool,
) -> Result<JobProgressState> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);
    let state = tracker.on_log_line(job_id, line)?;
    if state.current_progress != previous.current_progress || state.terminal != previous.terminal {
        report(&state, json)?;
    }
    Ok(state)
}

fn report(state: &JobProgressState, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(state).context("Failed to serialize job state")?;
        println!("{}", line);
    } else {
        let stage = state
            .stage_description
            .as_deref()
            .or(state.last_matched_phase.as_deref())
            .unwrap_or("started");
        println!("[{:>3}%] {}", state.current_progress, stage);
    }
    Ok(())
}
