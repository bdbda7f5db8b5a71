use serde_json::json;

use crate::calc::{
    average_mark, backlog_subjects, ensure_subjects, mark_tier, semester_averages,
    semester_subjects, set_mark,
};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_select_semester(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(semester) = req.params.get("semester").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing semester", None);
    };
    let Some(subjects) = semester_subjects(semester) else {
        return err(&req.id, "bad_params", "unknown semester", None);
    };

    state.semester = semester;
    ensure_subjects(&mut state.marks, subjects);
    ok(
        &req.id,
        json!({ "semester": semester, "subjects": subjects }),
    )
}

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(subject) = req.params.get("subject").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing subject", None);
    };
    let Some(value) = req.params.get("mark").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "mark must be an integer", None);
    };
    let subjects = semester_subjects(state.semester).unwrap_or(&[]);
    if !subjects.contains(&subject) {
        return err(
            &req.id,
            "bad_params",
            "subject is not in the active semester",
            None,
        );
    }

    // Out-of-range values clamp silently; they are not rejected.
    set_mark(&mut state.marks, subject, value);
    let stored = state.marks.get(subject).copied().unwrap_or(0);
    ok(
        &req.id,
        json!({ "subject": subject, "mark": stored, "tier": mark_tier(stored) }),
    )
}

fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subjects = semester_subjects(state.semester).unwrap_or(&[]);
    let rows: Vec<serde_json::Value> = subjects
        .iter()
        .map(|subject| {
            let mark = state.marks.get(*subject).copied().unwrap_or(0);
            json!({ "subject": subject, "mark": mark, "tier": mark_tier(mark) })
        })
        .collect();
    let averages: Vec<serde_json::Value> = semester_averages(&state.marks)
        .into_iter()
        .map(|(semester, average)| json!({ "semester": semester, "average": average }))
        .collect();

    ok(
        &req.id,
        json!({
            "semester": state.semester,
            "subjects": rows,
            "averageMark": average_mark(&state.marks, subjects),
            "backlogSubjects": backlog_subjects(&state.marks, subjects),
            "semesterAverages": averages,
            // Marks live in daemon memory only; there is no backend
            // persistence call for them.
            "persisted": false
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.selectSemester" => Some(handle_select_semester(state, req)),
        "marks.set" => Some(handle_set(state, req)),
        "marks.summary" => Some(handle_summary(state, req)),
        _ => None,
    }
}
