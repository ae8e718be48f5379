use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use mission_core::config::CronConfig;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{CronError, Result};
use crate::snapshot::parse_snapshot;
use crate::types::ScheduleDescriptor;

const STDERR_KEEP_BYTES: u64 = 64 * 1024;

/// Source of the current descriptor set.
///
/// Implementations must have no side effects on failure; the coordinator
/// treats every error the same way.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<ScheduleDescriptor>>;
}

/// Runs `openclaw cron list --all --json` and parses its stdout.
pub struct CliSnapshotFetcher {
    command: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
}

impl CliSnapshotFetcher {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        let defaults = CronConfig::default();
        Self {
            command: command.into(),
            args,
            timeout: Duration::from_millis(defaults.timeout_ms),
            max_output_bytes: defaults.max_output_bytes,
        }
    }

    pub fn from_config(config: &CronConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_max_output_bytes(config.max_output_bytes)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, max: usize) -> Self {
        self.max_output_bytes = max;
        self
    }

    async fn run(&self) -> Result<String> {
        let mut child = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CronError::Fetch(format!("'{}' not found on PATH", self.command))
                } else {
                    CronError::Fetch(format!("failed to spawn '{}': {e}", self.command))
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CronError::Fetch("child stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CronError::Fetch("child stderr not captured".into()))?;

        // Drain both pipes together so a chatty stderr cannot stall the child.
        // stdout is read one byte past the cap so oversized output is detected.
        let cap = self.max_output_bytes;
        let read_out = async move {
            let mut out = Vec::new();
            stdout.take(cap as u64 + 1).read_to_end(&mut out).await.map(|_| out)
        };
        let read_err = async move {
            let mut err = Vec::new();
            let _ = (&mut stderr).take(STDERR_KEEP_BYTES).read_to_end(&mut err).await;
            // Discard the rest; closing the pipe early would hit the child with EPIPE.
            let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
            err
        };
        let (out, err) = tokio::join!(read_out, read_err);
        let out = out.map_err(|e| CronError::Fetch(format!("reading stdout failed: {e}")))?;
        if out.len() > cap {
            return Err(CronError::Fetch(format!("output exceeds {cap} bytes")));
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CronError::Fetch(format!("process error: {e}")))?;
        if !status.success() {
            return Err(CronError::Fetch(format!(
                "'{}' exited with {status}: {}",
                self.command,
                truncate(&String::from_utf8_lossy(&err), 500)
            )));
        }

        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[async_trait]
impl SnapshotFetcher for CliSnapshotFetcher {
    async fn fetch(&self) -> Result<Vec<ScheduleDescriptor>> {
        debug!(command = %self.command, args = ?self.args, "fetching cron snapshot");
        // Dropping the future on timeout kills the child (kill_on_drop).
        let stdout = tokio::time::timeout(self.timeout, self.run())
            .await
            .map_err(|_| CronError::Fetch(format!("timed out after {:?}", self.timeout)))??;
        let jobs = parse_snapshot(&stdout)?;
        debug!(jobs = jobs.len(), "cron snapshot fetched");
        Ok(jobs)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
