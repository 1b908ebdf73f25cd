use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The agent's `session.json`. Every field is optional and read on its
/// own: a field of an unexpected type is dropped without rejecting the rest.
/// Scalars the API echoes back are kept as raw JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
	pub session_id: Option<Value>,
	pub status: Option<Value>,
	pub agent_plugin: Option<Value>,
	pub cwd: Option<Value>,
	pub current_iteration: Option<Value>,
	pub max_iterations: Option<Value>,
	pub tasks_completed: Option<Value>,
	#[serde(default, deserialize_with = "lenient")]
	pub tracker_state: Option<TrackerState>,
	pub active_task_ids: Option<Value>,
	#[serde(default, deserialize_with = "lenient")]
	pub iterations: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
	/// Authoritative count; `tasks` may lag behind it.
	pub total_tasks: Option<Value>,
	#[serde(default, deserialize_with = "lenient")]
	pub tasks: Option<Vec<Value>>,
}

/// Accept any JSON for the field; a value that doesn't fit `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let value = Value::deserialize(deserializer)?;
	Ok(serde_json::from_value(value).ok())
}

/// `session-meta.json` is passed through untouched.
pub type SessionMeta = Value;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IterationArtifact {
	pub file: String,
	pub mtime: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProcessSnapshot {
	pub ralph: Vec<String>,
	pub opencode: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub session_id: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub agent: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cwd: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub current_iteration: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_iterations: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tasks_completed: Option<Value>,
	pub total_tasks: Value,
	pub active_tasks: Value,
	pub meta: Option<SessionMeta>,
}

pub const NO_SESSION: &str = "No session found";
pub const NO_LOGS: &str = "No logs found";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StatusResponse {
	Found(SessionStatus),
	Missing { error: &'static str },
}

impl StatusResponse {
	pub fn missing() -> Self {
		StatusResponse::Missing { error: NO_SESSION }
	}
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TasksResponse {
	pub tasks: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryResponse {
	pub iterations: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RecentIterationsResponse {
	pub iterations: Vec<IterationArtifact>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogResponse {
	pub log: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,
}

impl LogResponse {
	pub fn not_found() -> Self {
		Self {
			log: NO_LOGS.to_string(),
			file: None,
		}
	}
}
