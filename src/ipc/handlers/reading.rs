use std::time::Instant;

use serde_json::json;

use crate::db;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};

fn persist_minutes(state: &AppState) {
    if let Some(conn) = state.db.as_ref() {
        let _ = db::settings_set_json(
            conn,
            db::READING_MINUTES_KEY,
            &json!(state.reading.stored_minutes),
        );
    }
}

fn handle_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.reading.started.take() {
        Some(started) => {
            state.reading.stored_minutes += started.elapsed().as_secs_f64() / 60.0;
            persist_minutes(state);
            ok(
                &req.id,
                json!({ "active": false, "totalMinutes": state.reading.total_minutes() }),
            )
        }
        None => {
            state.reading.started = Some(Instant::now());
            ok(
                &req.id,
                json!({ "active": true, "totalMinutes": state.reading.total_minutes() }),
            )
        }
    }
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "active": state.reading.started.is_some(),
            "totalMinutes": state.reading.total_minutes()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reading.toggle" => Some(handle_toggle(state, req)),
        "reading.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
