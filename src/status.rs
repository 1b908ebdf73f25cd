//! Projections of the session record into the API response shapes.

use crate::model::{
	HistoryResponse, SessionMeta, SessionRecord, SessionStatus, StatusResponse, TasksResponse,
};
use crate::session::SessionStore;
use serde_json::Value;

pub fn build_status(store: &SessionStore) -> StatusResponse {
	let session = store.read_session();
	let meta = store.read_meta();
	project_status(session, meta)
}

pub fn project_status(session: Option<SessionRecord>, meta: Option<SessionMeta>) -> StatusResponse {
	let Some(session) = session else {
		return StatusResponse::missing();
	};

	let total_tasks = session
		.tracker_state
		.and_then(|t| t.total_tasks)
		.unwrap_or_else(|| Value::from(0));

	StatusResponse::Found(SessionStatus {
		session_id: session.session_id,
		status: session.status,
		agent: session.agent_plugin,
		cwd: session.cwd,
		current_iteration: session.current_iteration,
		max_iterations: session.max_iterations,
		tasks_completed: session.tasks_completed,
		total_tasks,
		active_tasks: session
			.active_task_ids
			.unwrap_or_else(|| Value::Array(Vec::new())),
		meta,
	})
}

pub fn build_tasks(store: &SessionStore) -> TasksResponse {
	let tasks = store
		.read_session()
		.and_then(|s| s.tracker_state)
		.and_then(|t| t.tasks)
		.unwrap_or_default();
	TasksResponse { tasks }
}

pub fn build_history(store: &SessionStore) -> HistoryResponse {
	let iterations = store
		.read_session()
		.and_then(|s| s.iterations)
		.unwrap_or_default();
	HistoryResponse { iterations }
}
