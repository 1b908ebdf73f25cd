//! HTTP routes. Every handler does a fresh read of the agent's files and
//! always answers 200; missing or broken agent state shows up as empty values.

use crate::config::Config;
use crate::iterations::IterationIndex;
use crate::model::{
	HistoryResponse, LogResponse, ProcessSnapshot, RecentIterationsResponse, StatusResponse,
	TasksResponse,
};
use crate::process::{ProcessInspector, ProcessLister, ShellProcessLister};
use crate::session::SessionStore;
use crate::status::{build_history, build_status, build_tasks};
use anyhow::{Context, Result};
use axum::{
	Json, Router,
	extract::{Path, State},
	routing::get,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
	pub store: SessionStore,
	pub index: IterationIndex,
	pub inspector: ProcessInspector,
}

impl AppState {
	pub fn new(cfg: &Config, lister: Arc<dyn ProcessLister>) -> Self {
		Self {
			store: SessionStore::from_config(cfg),
			index: IterationIndex::from_config(cfg),
			inspector: ProcessInspector::new(lister),
		}
	}
}

/// Run blocking filesystem work off the async workers. A panicked read
/// degrades to `fallback` like any other failed read.
async fn blocking<T, F, D>(f: F, fallback: D) -> T
where
	T: Send + 'static,
	F: FnOnce() -> T + Send + 'static,
	D: FnOnce() -> T,
{
	match tokio::task::spawn_blocking(f).await {
		Ok(value) => value,
		Err(e) => {
			warn!("filesystem read task failed: {e}");
			fallback()
		}
	}
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
	let store = state.store;
	Json(blocking(move || build_status(&store), StatusResponse::missing).await)
}

async fn get_tasks(State(state): State<AppState>) -> Json<TasksResponse> {
	let store = state.store;
	Json(blocking(move || build_tasks(&store), || TasksResponse { tasks: Vec::new() }).await)
}

async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
	let store = state.store;
	Json(
		blocking(move || build_history(&store), || HistoryResponse {
			iterations: Vec::new(),
		})
		.await,
	)
}

async fn get_recent_iterations(State(state): State<AppState>) -> Json<RecentIterationsResponse> {
	let index = state.index;
	let iterations = blocking(move || index.list_recent(), Vec::new).await;
	Json(RecentIterationsResponse { iterations })
}

async fn get_processes(State(state): State<AppState>) -> Json<ProcessSnapshot> {
	Json(state.inspector.snapshot().await)
}

async fn get_log(State(state): State<AppState>, Path(task_id): Path<String>) -> Json<LogResponse> {
	let index = state.index;
	let found = blocking(move || index.read_log(&task_id), || None).await;
	Json(match found {
		Some((log, file)) => LogResponse {
			log,
			file: Some(file),
		},
		None => LogResponse::not_found(),
	})
}

pub fn router(state: AppState, public_dir: &FsPath) -> Router {
	let api = Router::new()
		.route("/api/status", get(get_status))
		.route("/api/tasks", get(get_tasks))
		.route("/api/history", get(get_history))
		.route("/api/iterations", get(get_recent_iterations))
		.route("/api/processes", get(get_processes))
		.route("/api/logs/{task_id}", get(get_log))
		.with_state(state);

	let app = if public_dir.is_dir() {
		api.fallback_service(ServeDir::new(public_dir))
	} else {
		warn!(
			"UI directory {} not found; serving API only",
			public_dir.display()
		);
		api.route(
			"/",
			get(|| async { "Ralph Monitor API. UI assets not found; see /api/status." }),
		)
	};

	app.layer(TraceLayer::new_for_http())
}

pub async fn serve(cfg: &Config) -> Result<()> {
	let lister: Arc<dyn ProcessLister> = Arc::new(ShellProcessLister::new(cfg.process_timeout));
	let app = router(AppState::new(cfg, lister), &cfg.public_dir);

	let addr = cfg.listen_addr();
	let listener = tokio::net::TcpListener::bind(addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;

	info!("Ralph Monitor: http://localhost:{}", cfg.port);
	info!("Ralph Dir: {}", cfg.ralph_dir.display());

	axum::serve(listener, app).await.context("server error")?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use axum::body::Body;
	use axum::http::{Request, StatusCode};
	use http_body_util::BodyExt;
	use serde_json::{Value, json};
	use std::fs;
	use std::net::{IpAddr, Ipv4Addr};
	use tempfile::TempDir;
	use tower::ServiceExt;

	struct FakeLister;

	#[async_trait]
	impl ProcessLister for FakeLister {
		async fn list(&self, pattern: &str) -> Result<Vec<String>> {
			match pattern {
				"opencode" => Ok(vec!["user 77 0.0 0.1 opencode serve".to_string()]),
				_ => Err(anyhow::anyhow!("exit status 1")),
			}
		}
	}

	fn setup() -> (TempDir, Config, Router) {
		let temp = TempDir::new().unwrap();
		let cfg = Config::new(
			IpAddr::V4(Ipv4Addr::LOCALHOST),
			0,
			temp.path().to_str().unwrap(),
			&temp.path().join("public"),
			5,
		)
		.unwrap();
		let app = router(AppState::new(&cfg, Arc::new(FakeLister)), &cfg.public_dir);
		(temp, cfg, app)
	}

	fn write_session(cfg: &Config, body: &Value) {
		fs::create_dir_all(cfg.state_dir()).unwrap();
		fs::write(cfg.session_file(), body.to_string()).unwrap();
	}

	async fn get_json(app: &Router, uri: &str) -> Value {
		let response = app
			.clone()
			.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		serde_json::from_slice(&bytes).unwrap()
	}

	#[tokio::test]
	async fn test_empty_ralph_dir() {
		let (_temp, _cfg, app) = setup();

		assert_eq!(
			get_json(&app, "/api/status").await,
			json!({ "error": "No session found" })
		);
		assert_eq!(get_json(&app, "/api/tasks").await, json!({ "tasks": [] }));
		assert_eq!(get_json(&app, "/api/history").await, json!({ "iterations": [] }));
		assert_eq!(get_json(&app, "/api/iterations").await, json!({ "iterations": [] }));
		assert_eq!(
			get_json(&app, "/api/logs/t1").await,
			json!({ "log": "No logs found" })
		);
	}

	#[tokio::test]
	async fn test_status_round_trip() {
		let (_temp, cfg, app) = setup();
		write_session(
			&cfg,
			&json!({
				"sessionId": "s1",
				"status": "running",
				"currentIteration": 3,
				"maxIterations": 10,
				"trackerState": { "totalTasks": 2, "tasks": [{ "id": "t1" }, { "id": "t2" }] }
			}),
		);

		let status = get_json(&app, "/api/status").await;
		assert_eq!(status["sessionId"], "s1");
		assert_eq!(status["status"], "running");
		assert_eq!(status["currentIteration"], 3);
		assert_eq!(status["maxIterations"], 10);
		assert_eq!(status["totalTasks"], 2);

		let tasks = get_json(&app, "/api/tasks").await;
		assert_eq!(tasks, json!({ "tasks": [{ "id": "t1" }, { "id": "t2" }] }));
	}

	#[tokio::test]
	async fn test_malformed_session() {
		let (_temp, cfg, app) = setup();
		fs::create_dir_all(cfg.state_dir()).unwrap();
		fs::write(cfg.session_file(), "{\"sessionId\": ").unwrap();

		assert_eq!(
			get_json(&app, "/api/status").await,
			json!({ "error": "No session found" })
		);
		assert_eq!(get_json(&app, "/api/history").await, json!({ "iterations": [] }));
	}

	#[tokio::test]
	async fn test_mistyped_fields_keep_session() {
		let (_temp, cfg, app) = setup();
		write_session(
			&cfg,
			&json!({
				"sessionId": "s1",
				"status": "running",
				"activeTaskIds": [1, 2],
				"trackerState": { "totalTasks": 2, "tasks": [{ "id": "t1" }] }
			}),
		);

		let status = get_json(&app, "/api/status").await;
		assert_eq!(status["sessionId"], "s1");
		assert_eq!(status["activeTasks"], json!([1, 2]));
		assert_eq!(status["totalTasks"], 2);
		assert_eq!(
			get_json(&app, "/api/tasks").await,
			json!({ "tasks": [{ "id": "t1" }] })
		);

		write_session(&cfg, &json!({ "sessionId": 42, "currentIteration": -1 }));
		let status = get_json(&app, "/api/status").await;
		assert!(status.get("error").is_none());
		assert_eq!(status["sessionId"], 42);
		assert_eq!(status["currentIteration"], -1);
	}

	#[tokio::test]
	async fn test_tasks_without_tracker_state() {
		let (_temp, cfg, app) = setup();
		write_session(&cfg, &json!({ "sessionId": "s1", "iterations": [{ "n": 1 }] }));

		assert_eq!(get_json(&app, "/api/tasks").await, json!({ "tasks": [] }));
		assert_eq!(
			get_json(&app, "/api/history").await,
			json!({ "iterations": [{ "n": 1 }] })
		);
	}

	#[tokio::test]
	async fn test_processes_isolated() {
		let (_temp, _cfg, app) = setup();
		assert_eq!(
			get_json(&app, "/api/processes").await,
			json!({ "ralph": [], "opencode": ["user 77 0.0 0.1 opencode serve"] })
		);
	}

	#[tokio::test]
	async fn test_logs_latest_by_name() {
		let (_temp, cfg, app) = setup();
		let dir = cfg.iterations_dir();
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join("task-t1-001.log"), "first").unwrap();
		fs::write(dir.join("task-t1-002.log"), "second").unwrap();

		assert_eq!(
			get_json(&app, "/api/logs/t1").await,
			json!({ "log": "second", "file": "task-t1-002.log" })
		);

		let recent = get_json(&app, "/api/iterations").await;
		assert_eq!(recent["iterations"].as_array().unwrap().len(), 2);
	}

	#[tokio::test]
	async fn test_serves_ui_assets() {
		let (temp, cfg, _app) = setup();
		fs::create_dir_all(&cfg.public_dir).unwrap();
		fs::write(cfg.public_dir.join("index.html"), "<h1>ralph</h1>").unwrap();
		let app = router(AppState::new(&cfg, Arc::new(FakeLister)), &cfg.public_dir);

		let response = app
			.oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		let bytes = response.into_body().collect().await.unwrap().to_bytes();
		assert_eq!(&bytes[..], b"<h1>ralph</h1>");
		drop(temp);
	}
}
