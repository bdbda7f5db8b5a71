use serde_json::json;

use crate::backend::{ClassAnalytics, StudentDraft, StudentOverview};
use crate::calc::{filter_roster, SectionError};
use crate::ipc::error::{err, ok};
use super::predictor::prediction_json;
use crate::ipc::types::{AppState, Request};

fn student_json(student: &StudentOverview) -> serde_json::Value {
    json!({
        "id": student.id,
        "studentId": student.student_id,
        "name": student.name,
        "email": student.email,
        "className": student.class_name,
        "year": student.year,
        "section": student.section,
        "latestPrediction": student.latest_prediction.as_ref().map(prediction_json)
    })
}

fn analytics_json(analytics: &ClassAnalytics) -> serde_json::Value {
    json!({
        "totalStudents": analytics.total_students,
        "totalPredictions": analytics.total_predictions,
        "averageScore": analytics.average_score,
        "riskDistribution": {
            "lowRisk": analytics.risk_distribution.low_risk,
            "mediumRisk": analytics.risk_distribution.medium_risk,
            "highRisk": analytics.risk_distribution.high_risk
        },
        "passRate": analytics.pass_rate
    })
}

fn sections_json(state: &AppState) -> serde_json::Value {
    json!({
        "sections": state.sections.labels(),
        "selected": state.sections.selected_label()
    })
}

/// Loads the class overview and analytics together. On failure the cached
/// rows stay untouched; there is no silent demo substitution in remote mode.
fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    let demo = backend.mode() == "demo";

    let overview = backend.students_overview();
    let analytics = backend.class_analytics();
    match (overview, analytics) {
        (Ok(students), Ok(analytics)) => {
            state.roster = students;
            state.analytics = Some(analytics);
            let rows: Vec<serde_json::Value> = state.roster.iter().map(student_json).collect();
            ok(
                &req.id,
                json!({
                    "demo": demo,
                    "students": rows,
                    "analytics": state.analytics.as_ref().map(analytics_json)
                }),
            )
        }
        _ => err(&req.id, "backend_error", "Unable to load class data.", None),
    }
}

fn handle_filter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(year) = req.params.get("year").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing year", None);
    };
    let section = req
        .params
        .get("section")
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| state.sections.selected_label())
        .to_string();
    let risk = req
        .params
        .get("risk")
        .and_then(|v| v.as_str())
        .unwrap_or("all");
    if !matches!(risk, "all" | "Low" | "Medium" | "High") {
        return err(
            &req.id,
            "bad_params",
            "risk must be one of: all, Low, Medium, High",
            None,
        );
    }

    let matched = filter_roster(&state.roster, year, &section, risk);
    let rows: Vec<serde_json::Value> = matched.iter().map(|s| student_json(s)).collect();
    ok(&req.id, json!({ "students": rows, "count": rows.len() }))
}

fn draft_from_params(state: &AppState, req: &Request) -> Result<StudentDraft, serde_json::Value> {
    let text = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let student_id = text("studentId");
    let name = text("name");
    let email = text("email");
    if student_id.is_empty() || name.is_empty() || email.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            "studentId, name, and email are required",
            None,
        ));
    }
    let Some(year) = req.params.get("year").and_then(|v| v.as_i64()) else {
        return Err(err(&req.id, "bad_params", "missing year", None));
    };
    let section = req
        .params
        .get("section")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.sections.selected_label().to_string());

    Ok(StudentDraft {
        student_id,
        name,
        email,
        class_name: text("className"),
        year,
        section,
    })
}

fn refresh_roster(state: &mut AppState) {
    // Best-effort refresh after a mutation; a failed fetch keeps the cache.
    if let Some(backend) = state.backend.as_ref() {
        if let Ok(students) = backend.students_overview() {
            state.roster = students;
        }
    }
}

fn handle_student_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let draft = match draft_from_params(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.create_student(&draft) {
        Ok(created) => {
            refresh_roster(state);
            ok(&req.id, json!({ "student": student_json(&created) }))
        }
        Err(_) => err(&req.id, "backend_error", "Unable to add student.", None),
    }
}

fn handle_student_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = req.params.get("id").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let draft = match draft_from_params(state, req) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.update_student(id, &draft) {
        Ok(()) => {
            refresh_roster(state);
            ok(&req.id, json!({ "updated": true }))
        }
        Err(_) => err(&req.id, "backend_error", "Unable to update student.", None),
    }
}

fn handle_student_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(id) = req.params.get("id").and_then(|v| v.as_i64()) else {
        return err(&req.id, "bad_params", "missing id", None);
    };
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.delete_student(id) {
        Ok(()) => {
            refresh_roster(state);
            ok(&req.id, json!({ "deleted": true }))
        }
        Err(_) => err(&req.id, "backend_error", "Failed to delete student.", None),
    }
}

fn section_error(req: &Request, e: SectionError) -> serde_json::Value {
    match e {
        SectionError::EmptyName => err(&req.id, "bad_params", "section name must not be empty", None),
        SectionError::Duplicate => err(&req.id, "duplicate_section", "Section already exists", None),
        SectionError::LastSection => err(
            &req.id,
            "last_section",
            "at least one section must remain",
            None,
        ),
        SectionError::NotFound => err(&req.id, "not_found", "section not found", None),
    }
}

fn handle_sections_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    match state.sections.add(name) {
        Ok(label) => {
            let mut result = sections_json(state);
            result["added"] = json!(label);
            ok(&req.id, result)
        }
        Err(e) => section_error(req, e),
    }
}

fn handle_sections_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    match state.sections.remove(name) {
        Ok(()) => ok(&req.id, sections_json(state)),
        Err(e) => section_error(req, e),
    }
}

fn handle_sections_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = req
        .params
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    match state.sections.select(name) {
        Ok(()) => ok(&req.id, sections_json(state)),
        Err(e) => section_error(req, e),
    }
}

fn handle_sections_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, sections_json(state))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.open" => Some(handle_open(state, req)),
        "roster.filter" => Some(handle_filter(state, req)),
        "students.create" => Some(handle_student_create(state, req)),
        "students.update" => Some(handle_student_update(state, req)),
        "students.delete" => Some(handle_student_delete(state, req)),
        "sections.add" => Some(handle_sections_add(state, req)),
        "sections.remove" => Some(handle_sections_remove(state, req)),
        "sections.select" => Some(handle_sections_select(state, req)),
        "sections.list" => Some(handle_sections_list(state, req)),
        _ => None,
    }
}
