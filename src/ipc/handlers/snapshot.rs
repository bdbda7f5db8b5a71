use std::collections::BTreeMap;
use std::path::Path;

use serde_json::json;

use crate::backup;
use crate::calc::{clamp_mark, ensure_subjects, semester_subjects, PerformanceInputs, SectionList};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::week::{format_date, parse_date, week_start_of, TaskEntry};

/// Everything the dashboard owns, in the shape the export file carries.
fn dashboard_state_json(state: &AppState) -> serde_json::Value {
    json!({
        "weekStart": format_date(state.board.board.week_start),
        "entries": &state.board.board.entries,
        "marks": &state.marks,
        "semester": state.semester,
        "inputs": &state.inputs,
        "sections": state.sections.labels(),
        "selectedSection": state.sections.selected_label(),
        "readingMinutes": state.reading.total_minutes()
    })
}

/// Field-by-field restore. Every value is re-validated on the way in: marks
/// clamp, the semester must exist in the catalog, inputs clamp, and the
/// section list re-normalizes.
fn restore_state(state: &mut AppState, v: &serde_json::Value) {
    if let Some(week) = v
        .get("weekStart")
        .and_then(|w| w.as_str())
        .and_then(parse_date)
    {
        let week = week_start_of(week);
        let entries: Vec<TaskEntry> = v
            .get("entries")
            .and_then(|e| serde_json::from_value(e.clone()).ok())
            .unwrap_or_default();
        let generation = state.board.begin_open(week);
        state.board.apply_remote(week, generation, &entries);
    }

    if let Some(marks) = v
        .get("marks")
        .and_then(|m| serde_json::from_value::<BTreeMap<String, i64>>(m.clone()).ok())
    {
        state.marks = marks
            .into_iter()
            .map(|(subject, mark)| (subject, clamp_mark(mark)))
            .collect();
    }

    if let Some(semester) = v.get("semester").and_then(|s| s.as_i64()) {
        if let Some(subjects) = semester_subjects(semester) {
            state.semester = semester;
            ensure_subjects(&mut state.marks, subjects);
        }
    }

    if let Some(inputs) = v
        .get("inputs")
        .and_then(|i| serde_json::from_value::<PerformanceInputs>(i.clone()).ok())
    {
        state.inputs = inputs.clamped();
    }

    if let Some(labels) = v
        .get("sections")
        .and_then(|s| serde_json::from_value::<Vec<String>>(s.clone()).ok())
    {
        let selected = v
            .get("selectedSection")
            .and_then(|s| s.as_str())
            .unwrap_or("");
        state.sections = SectionList::restore(&labels, selected);
    }

    if let Some(minutes) = v.get("readingMinutes").and_then(|m| m.as_f64()) {
        state.reading.stored_minutes = minutes.max(0.0);
        state.reading.started = None;
    }
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = req.params.get("outPath").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };

    let payload = dashboard_state_json(state);
    match backup::export_snapshot(&payload, state.workspace.as_deref(), Path::new(out_path)) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "entryCount": summary.entry_count,
                "stateDigest": summary.state_digest
            }),
        ),
        Err(e) => err(&req.id, "snapshot_failed", e.to_string(), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(in_path) = req.params.get("inPath").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };

    match backup::import_snapshot(Path::new(in_path)) {
        Ok(summary) => {
            restore_state(state, &summary.state);
            ok(
                &req.id,
                json!({
                    "bundleFormatDetected": summary.bundle_format_detected,
                    "restored": true
                }),
            )
        }
        Err(e) => err(&req.id, "snapshot_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "snapshot.export" => Some(handle_export(state, req)),
        "snapshot.import" => Some(handle_import(state, req)),
        _ => None,
    }
}
