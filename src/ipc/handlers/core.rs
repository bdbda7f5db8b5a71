use std::path::PathBuf;

use serde_json::json;

use crate::backend::{Backend, DemoBackend, HttpBackend, SessionUser};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request, SessionInfo};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "mode": state.backend.as_ref().map(|b| b.mode()),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "user": state.session.as_ref().map(|s| json!({
                "email": s.user.email,
                "fullName": s.user.full_name,
                "role": s.user.role
            }))
        }),
    )
}

fn handle_session_init(state: &mut AppState, req: &Request) -> serde_json::Value {
    let backend_params = req.params.get("backend");
    let mode = backend_params
        .and_then(|b| b.get("mode"))
        .and_then(|v| v.as_str())
        .unwrap_or("remote");
    let backend = match mode {
        "demo" => Backend::Demo(DemoBackend::new()),
        "remote" => {
            let base_url = backend_params
                .and_then(|b| b.get("baseUrl"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .or_else(|| std::env::var("STUDYBOARD_API_URL").ok())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
            Backend::Http(HttpBackend::new(&base_url))
        }
        _ => {
            return err(
                &req.id,
                "bad_params",
                "backend.mode must be \"remote\" or \"demo\"",
                None,
            )
        }
    };

    let workspace = req
        .params
        .get("workspace")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let mut db_conn = None;
    if let Some(path) = &workspace {
        match db::open_db(path) {
            Ok(conn) => db_conn = Some(conn),
            Err(e) => return err(&req.id, "store_error", e.to_string(), None),
        }
    }

    state.reset();
    state.backend = Some(backend);
    state.workspace = workspace;
    state.db = db_conn;

    // Best-effort restore: a malformed cache must not block session init.
    let mut restored_session = false;
    let mut cached: Option<SessionInfo> = None;
    if let Some(conn) = state.db.as_ref() {
        if let Ok(Some(v)) = db::settings_get_json(conn, db::READING_MINUTES_KEY) {
            if let Some(minutes) = v.as_f64() {
                state.reading.stored_minutes = minutes;
            }
        }
        if let Ok(Some(v)) = db::settings_get_json(conn, db::SESSION_KEY) {
            let token = v
                .get("token")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string());
            let user = v
                .get("user")
                .and_then(|u| serde_json::from_value::<SessionUser>(u.clone()).ok());
            if let (Some(token), Some(user)) = (token, user) {
                cached = Some(SessionInfo { token, user });
            }
        }
    }
    if let Some(info) = cached {
        if let Some(backend) = state.backend.as_mut() {
            backend.set_token(Some(info.token.clone()));
        }
        state.session = Some(info);
        restored_session = true;
    }

    if let Some(token) = req.params.get("token").and_then(|v| v.as_str()) {
        if let Some(backend) = state.backend.as_mut() {
            backend.set_token(Some(token.to_string()));
        }
    }

    ok(
        &req.id,
        json!({
            "mode": mode,
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "restoredSession": restored_session
        }),
    )
}

fn handle_session_teardown(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Fold a running focus timer into the stored counter before flushing.
    if let Some(started) = state.reading.started.take() {
        state.reading.stored_minutes += started.elapsed().as_secs_f64() / 60.0;
    }
    if let Some(conn) = state.db.as_ref() {
        let _ = db::settings_set_json(
            conn,
            db::READING_MINUTES_KEY,
            &json!(state.reading.stored_minutes),
        );
    }
    state.reset();
    ok(&req.id, json!({ "cleared": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "session.init" => Some(handle_session_init(state, req)),
        "session.teardown" => Some(handle_session_teardown(state, req)),
        _ => None,
    }
}
