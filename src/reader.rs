//! Best-effort file reads.
//!
//! The agent owns every file we look at and may be halfway through writing
//! any of them, so nothing here returns an error to the caller. Failures are
//! logged and collapse to `None`.

use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ReadError {
	#[error("{0} does not exist")]
	NotFound(String),
	#[error("failed to read {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: io::Error,
	},
	#[error("failed to parse {path}: {source}")]
	Parse {
		path: String,
		#[source]
		source: serde_json::Error,
	},
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
	fs::read(path).map_err(|source| {
		let path = path.display().to_string();
		if source.kind() == io::ErrorKind::NotFound {
			ReadError::NotFound(path)
		} else {
			ReadError::Io { path, source }
		}
	})
}

pub fn try_read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ReadError> {
	let bytes = read_bytes(path)?;
	serde_json::from_slice(&bytes).map_err(|source| ReadError::Parse {
		path: path.display().to_string(),
		source,
	})
}

pub fn try_read_text(path: &Path) -> Result<String, ReadError> {
	let bytes = read_bytes(path)?;
	Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse `path` as JSON, or `None` if it is missing or malformed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
	absent_on_error(try_read_json(path))
}

/// Read `path` as text (invalid UTF-8 is replaced), or `None` if unreadable.
pub fn read_text(path: &Path) -> Option<String> {
	absent_on_error(try_read_text(path))
}

fn absent_on_error<T>(result: Result<T, ReadError>) -> Option<T> {
	match result {
		Ok(value) => Some(value),
		Err(err @ ReadError::NotFound(_)) => {
			debug!("{err}");
			None
		}
		Err(err) => {
			warn!("{err}");
			None
		}
	}
}
