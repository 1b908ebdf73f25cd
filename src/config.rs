use anyhow::Result;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3847;
pub const DEFAULT_RALPH_DIR: &str = "~/ralph-test";

/// Directory the agent keeps its state in, relative to the ralph dir.
const STATE_SUBDIR: &str = ".ralph-tui";
const SESSION_FILE: &str = "session.json";
const META_FILE: &str = "session-meta.json";
const ITERATIONS_SUBDIR: &str = "iterations";

/// Resolved runtime configuration. Built once in `main` and handed to
/// every component that needs a path or a limit.
#[derive(Debug, Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	pub ralph_dir: PathBuf,
	pub public_dir: PathBuf,
	pub process_timeout: Duration,
}

impl Config {
	pub fn new(
		host: IpAddr,
		port: u16,
		ralph_dir: &str,
		public_dir: &Path,
		process_timeout_secs: u64,
	) -> Result<Self> {
		let ralph_dir = PathBuf::from(expand_path(ralph_dir));
		if ralph_dir.as_os_str().is_empty() {
			anyhow::bail!("ralph dir must not be empty");
		}
		Ok(Self {
			host,
			port,
			ralph_dir,
			public_dir: public_dir.to_path_buf(),
			process_timeout: Duration::from_secs(process_timeout_secs),
		})
	}

	pub fn listen_addr(&self) -> SocketAddr {
		SocketAddr::new(self.host, self.port)
	}

	pub fn state_dir(&self) -> PathBuf {
		self.ralph_dir.join(STATE_SUBDIR)
	}

	pub fn session_file(&self) -> PathBuf {
		self.state_dir().join(SESSION_FILE)
	}

	pub fn iterations_dir(&self) -> PathBuf {
		self.state_dir().join(ITERATIONS_SUBDIR)
	}
}

/// Companion metadata path: same directory as the session file, with
/// `session.json` swapped for `session-meta.json`.
pub fn meta_path_for(session_file: &Path) -> PathBuf {
	session_file.with_file_name(META_FILE)
}

pub fn expand_path(input: &str) -> String {
	if input == "~" {
		if let Some(home) = dirs::home_dir() {
			return home.to_string_lossy().into_owned();
		}
	}
	if input.starts_with("~/") {
		if let Some(home) = dirs::home_dir() {
			return home
				.join(input.trim_start_matches("~/"))
				.to_string_lossy()
				.into_owned();
		}
	}
	input.to_string()
}
