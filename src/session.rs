//! Access to the agent's session files.
//!
//! `session.json` and `session-meta.json` are written independently by the
//! agent, so the two reads are independent too and may observe different
//! generations of the run.

use crate::config::{Config, meta_path_for};
use crate::model::{SessionMeta, SessionRecord};
use crate::reader::read_json;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SessionStore {
	session_path: PathBuf,
	meta_path: PathBuf,
}

impl SessionStore {
	pub fn new(session_path: &Path) -> Self {
		Self {
			session_path: session_path.to_path_buf(),
			meta_path: meta_path_for(session_path),
		}
	}

	pub fn from_config(cfg: &Config) -> Self {
		Self::new(&cfg.session_file())
	}

	/// Only a JSON object counts as a session; fields inside it are read
	/// one by one and a mistyped field never discards the record.
	pub fn read_session(&self) -> Option<SessionRecord> {
		let value: Value = read_json(&self.session_path)?;
		if !value.is_object() {
			warn!("{} is not a JSON object", self.session_path.display());
			return None;
		}
		match serde_json::from_value(value) {
			Ok(record) => Some(record),
			Err(e) => {
				warn!("failed to read {}: {e}", self.session_path.display());
				None
			}
		}
	}

	pub fn read_meta(&self) -> Option<SessionMeta> {
		read_json(&self.meta_path)
	}
}
