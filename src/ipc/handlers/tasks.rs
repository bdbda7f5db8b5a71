use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::week::{
    completion_percent, daily_reminder, format_date, longest_streak, parse_date, week_start_of,
    WeekDay,
};

fn board_json(state: &AppState) -> serde_json::Value {
    json!({
        "weekStart": format_date(state.board.board.week_start),
        "entries": &state.board.board.entries,
    })
}

/// Navigates the board to the Monday of the requested week and merges
/// whatever the remote store has for it. A fetch failure keeps the previous
/// board visible; it never clears local state.
fn handle_open_week(state: &mut AppState, req: &Request) -> serde_json::Value {
    let target = match req.params.get("weekStart").and_then(|v| v.as_str()) {
        Some(raw) => match parse_date(raw) {
            Some(date) => week_start_of(date),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "weekStart must be a YYYY-MM-DD date",
                    None,
                )
            }
        },
        None => week_start_of(chrono::Local::now().date_naive()),
    };

    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };

    let generation = state.board.begin_open(target);
    match backend.get_week(target) {
        Ok(remote) => {
            let applied = state.board.apply_remote(target, generation, &remote);
            let mut result = board_json(state);
            result["loaded"] = json!(true);
            result["applied"] = json!(applied);
            ok(&req.id, result)
        }
        Err(_) => {
            let mut result = board_json(state);
            result["loaded"] = json!(false);
            result["notice"] = json!("Unable to load weekly tasks; previous board kept.");
            ok(&req.id, result)
        }
    }
}

fn parse_day(req: &Request) -> Result<WeekDay, serde_json::Value> {
    let raw = req
        .params
        .get("day")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    WeekDay::parse(raw).ok_or_else(|| err(&req.id, "bad_params", "unknown day", None))
}

fn handle_set_text(state: &mut AppState, req: &Request) -> serde_json::Value {
    let day = match parse_day(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing text", None);
    };
    state.board.set_text(day, text);
    ok(&req.id, json!({ "day": day, "task": text }))
}

fn handle_toggle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let day = match parse_day(req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    state.board.toggle(day);
    let completed = state
        .board
        .board
        .entries
        .iter()
        .find(|e| e.day == day)
        .map(|e| e.completed)
        .unwrap_or(false);
    ok(&req.id, json!({ "day": day, "completed": completed }))
}

/// Explicit persistence. The caller decides when to sync; a failure keeps
/// every local edit in memory and is not retried.
fn handle_sync(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };

    let week_start = state.board.board.week_start;
    let generation = state.board.generation();
    match backend.sync_week(week_start, &state.board.board.entries) {
        Ok(echo) => {
            let applied = state.board.apply_remote(week_start, generation, &echo);
            let mut result = board_json(state);
            result["synced"] = json!(true);
            result["applied"] = json!(applied);
            ok(&req.id, result)
        }
        Err(_) => err(
            &req.id,
            "sync_failed",
            "Unable to save tasks; local edits kept in memory.",
            None,
        ),
    }
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let board = &state.board.board;
    ok(
        &req.id,
        json!({
            "weekStart": format_date(board.week_start),
            "entries": &board.entries,
            "longestStreak": longest_streak(board),
            "completionPercent": completion_percent(board),
            "dailyReminder": daily_reminder(board),
            "taskBoost": state.board.task_boost()
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tasks.openWeek" => Some(handle_open_week(state, req)),
        "tasks.setText" => Some(handle_set_text(state, req)),
        "tasks.toggle" => Some(handle_toggle(state, req)),
        "tasks.sync" => Some(handle_sync(state, req)),
        "tasks.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
