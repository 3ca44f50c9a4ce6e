//! Log discovery and fixed-interval polling
//!
//! Finds the newest ACARS log in a directory (names start with
//! `YYYYMMDD-HHMM-log`, so the lexicographically greatest name is the
//! newest), copies it aside so the producer can keep appending, and feeds
//! the whole snapshot through the parser. Runs until cancelled; the sleep
//! between cycles is interruptible so shutdown does not wait out the poll
//! interval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::parser::LogParser;
use crate::state::AircraftStateStore;

static LOG_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}-\d{4}-log").unwrap());

/// Scratch copy of the live log, written next to it each cycle.
const SCRATCH_FILE: &str = "log_temp.txt";

#[derive(Debug, Clone)]
pub struct LogWatcherConfig {
    pub log_dir: PathBuf,
    pub poll_interval: Duration,
}

/// Newest log file in `dir`, or `None` when there are no logs yet.
pub fn find_latest_log(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("reading log directory {}", dir.display()))?;

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if LOG_NAME_RE.is_match(&name) {
            names.push(name);
        }
    }

    names.sort();
    Ok(names.pop().map(|name| dir.join(name)))
}

/// Copy the live log to the scratch file and read it, replacing any invalid
/// byte sequences instead of failing the snapshot.
pub fn read_snapshot(log_path: &Path, scratch: &Path) -> Result<String> {
    std::fs::copy(log_path, scratch)
        .with_context(|| format!("copying {} to scratch", log_path.display()))?;
    let bytes = std::fs::read(scratch)
        .with_context(|| format!("reading snapshot {}", scratch.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Poll loop: one full re-parse of the newest snapshot per cycle, snapshots
/// strictly one at a time, until the token is cancelled.
pub async fn run_log_watcher(
    config: LogWatcherConfig,
    store: Arc<AircraftStateStore>,
    cancel: CancellationToken,
) {
    let scratch = config.log_dir.join(SCRATCH_FILE);
    let mut last_file: Option<PathBuf> = None;

    info!(
        dir = %config.log_dir.display(),
        interval_secs = config.poll_interval.as_secs(),
        "log watcher started"
    );

    loop {
        match find_latest_log(&config.log_dir) {
            Ok(Some(log_path)) => {
                if last_file.as_deref() != Some(log_path.as_path()) {
                    info!(path = %log_path.display(), "new log detected");
                    last_file = Some(log_path.clone());
                }
                match read_snapshot(&log_path, &scratch) {
                    Ok(text) => {
                        let mut parser = LogParser::new();
                        parser.process_snapshot(store.as_ref(), &text).await;
                    }
                    // State stays as-is for this cycle; never fatal.
                    Err(e) => warn!("failed to copy/read log: {e:#}"),
                }
            }
            Ok(None) => warn!("no log found in {}", config.log_dir.display()),
            Err(e) => warn!("log discovery failed: {e:#}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("log watcher shutting down");
                return;
            }
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}
