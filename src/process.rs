use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::model::ProcessSnapshot;

pub const RALPH_PATTERN: &str = "ralph";
pub const OPENCODE_PATTERN: &str = "opencode";

/// Max lines kept per process group.
pub const PROCESS_LIMIT: usize = 5;

/// Source of process-listing lines matching a pattern.
#[async_trait]
pub trait ProcessLister: Send + Sync {
	async fn list(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Lists processes with `ps aux | grep -E`.
pub struct ShellProcessLister {
	timeout: Duration,
	script: fn(&str) -> String,
}

impl ShellProcessLister {
	pub fn new(timeout: Duration) -> Self {
		Self::with_script(timeout, ps_script)
	}

	/// Run `script(pattern)` through `sh -c` instead of the `ps` pipeline.
	pub fn with_script(timeout: Duration, script: fn(&str) -> String) -> Self {
		Self { timeout, script }
	}
}

/// One spare line over the limit: the monitor's own entry is filtered out
/// after the listing, and the cap is applied then.
pub fn ps_script(pattern: &str) -> String {
	format!(
		"ps aux | grep -E \"{}\" | head -n {}",
		self_excluding_pattern(pattern),
		PROCESS_LIMIT + 1
	)
}

/// Wrap the first character in brackets so grep's own command line, which
/// contains the bracketed form, does not match the pattern.
pub fn self_excluding_pattern(pattern: &str) -> String {
	let mut chars = pattern.chars();
	match chars.next() {
		Some(first) => format!("[{first}]{}", chars.as_str()),
		None => String::new(),
	}
}

pub fn parse_lines(stdout: &str) -> Vec<String> {
	stdout
		.trim()
		.lines()
		.filter(|l| !l.trim().is_empty())
		.map(|l| l.to_string())
		.collect()
}

#[async_trait]
impl ProcessLister for ShellProcessLister {
	async fn list(&self, pattern: &str) -> Result<Vec<String>> {
		let script = (self.script)(pattern);

		let output = timeout(
			self.timeout,
			Command::new("sh")
				.arg("-c")
				.arg(&script)
				.kill_on_drop(true)
				.output(),
		)
		.await
		.with_context(|| format!("process listing for {pattern} timed out after {:?}", self.timeout))?
		.context("failed to run process listing")?;

		if !output.status.success() {
			return Err(anyhow::anyhow!(
				"process listing for {} failed (status {}): {}",
				pattern,
				output.status,
				String::from_utf8_lossy(&output.stderr).trim()
			));
		}

		Ok(parse_lines(&String::from_utf8_lossy(&output.stdout)))
	}
}

#[derive(Clone)]
pub struct ProcessInspector {
	lister: Arc<dyn ProcessLister>,
	own_pid: u32,
}

impl ProcessInspector {
	pub fn new(lister: Arc<dyn ProcessLister>) -> Self {
		Self {
			lister,
			own_pid: std::process::id(),
		}
	}

	/// Query both groups concurrently. A failure in one leaves the other intact.
	pub async fn snapshot(&self) -> ProcessSnapshot {
		let (ralph, opencode) = tokio::join!(self.group(RALPH_PATTERN), self.group(OPENCODE_PATTERN));
		ProcessSnapshot { ralph, opencode }
	}

	async fn group(&self, pattern: &str) -> Vec<String> {
		match self.lister.list(pattern).await {
			Ok(lines) => {
				let mut lines: Vec<String> = lines
					.into_iter()
					.filter(|l| !is_own_process(l, self.own_pid))
					.collect();
				lines.truncate(PROCESS_LIMIT);
				debug!("{} {pattern} process(es)", lines.len());
				lines
			}
			Err(e) => {
				warn!("{e:#}");
				Vec::new()
			}
		}
	}
}

/// `ps aux` puts the PID in the second column. The monitor's own binary
/// name contains "ralph", so it is dropped from the listing.
fn is_own_process(line: &str, own_pid: u32) -> bool {
	line.split_whitespace()
		.nth(1)
		.and_then(|pid| pid.parse::<u32>().ok())
		== Some(own_pid)
}
