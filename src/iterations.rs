//! Index over the agent's per-iteration log files.

use crate::config::Config;
use crate::model::IterationArtifact;
use crate::reader::read_text;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RECENT_LIMIT: usize = 10;
const LOG_SUFFIX: &str = ".log";

#[derive(Debug, Clone)]
pub struct IterationIndex {
	dir: PathBuf,
}

impl IterationIndex {
	pub fn new(dir: &Path) -> Self {
		Self {
			dir: dir.to_path_buf(),
		}
	}

	pub fn from_config(cfg: &Config) -> Self {
		Self::new(&cfg.iterations_dir())
	}

	/// File names in the directory, or nothing if it can't be listed.
	fn entry_names(&self) -> Vec<(String, PathBuf)> {
		let entries = match fs::read_dir(&self.dir) {
			Ok(entries) => entries,
			Err(e) => {
				debug!("cannot list {}: {e}", self.dir.display());
				return Vec::new();
			}
		};
		entries
			.filter_map(|entry| entry.ok())
			.filter_map(|entry| {
				let name = entry.file_name().to_str()?.to_string();
				Some((name, entry.path()))
			})
			.collect()
	}

	/// The most recently modified `.log` files, newest first.
	pub fn list_recent(&self) -> Vec<IterationArtifact> {
		let mut artifacts: Vec<IterationArtifact> = self
			.entry_names()
			.into_iter()
			.filter(|(name, _)| name.ends_with(LOG_SUFFIX))
			.filter_map(|(name, path)| {
				// The agent may rotate a file away between listing and stat.
				let meta = fs::metadata(&path).ok()?;
				if !meta.is_file() {
					return None;
				}
				let mtime: DateTime<Utc> = meta.modified().ok()?.into();
				Some(IterationArtifact { file: name, mtime })
			})
			.collect();

		// Stable sort: ties keep directory order.
		artifacts.sort_by(|a, b| b.mtime.cmp(&a.mtime));
		artifacts.truncate(RECENT_LIMIT);
		artifacts
	}

	/// Greatest file name containing `fragment`. Writers embed a sortable
	/// key (timestamp or sequence) in names, so this is the latest one.
	pub fn find_by_fragment(&self, fragment: &str) -> Option<String> {
		self.entry_names()
			.into_iter()
			.map(|(name, _)| name)
			.filter(|name| name.contains(fragment))
			.max()
	}

	/// Content and file name of the latest log for `fragment`.
	pub fn read_log(&self, fragment: &str) -> Option<(String, String)> {
		let file = self.find_by_fragment(fragment)?;
		let content = read_text(&self.dir.join(&file))?;
		Some((content, file))
	}
}
