use serde_json::json;

use crate::backend::Prediction;
use crate::calc::{
    action_tip, average_mark, confidence_estimate, pass_hint, performance_score,
    score_risk_category, semester_subjects,
};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::week::{completion_percent, longest_streak};

pub fn prediction_json(p: &Prediction) -> serde_json::Value {
    json!({
        "id": p.id,
        "predictedScore": p.predicted_score,
        "passFail": p.pass_fail,
        "riskCategory": p.risk_category,
        "confidence": p.confidence,
        "studyHours": p.study_hours,
        "attendance": p.attendance,
        "assignmentsScore": p.assignments_score,
        "pastMarks": p.past_marks,
        "engagementScore": p.engagement_score,
        "createdAt": p.created_at
    })
}

fn handle_set_inputs(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    // Validate the whole patch before applying any of it.
    for (key, value) in patch {
        if !crate::calc::PerformanceInputs::is_field(key) {
            return err(
                &req.id,
                "bad_params",
                format!("unknown input field: {}", key),
                None,
            );
        }
        if value.as_f64().is_none() {
            return err(
                &req.id,
                "bad_params",
                format!("{} must be a number", key),
                None,
            );
        }
    }
    for (key, value) in patch {
        if let Some(number) = value.as_f64() {
            state.inputs.set_field(key, number);
        }
    }

    ok(&req.id, json!({ "inputs": &state.inputs }))
}

/// Client-side heuristic snapshot. Values here are local estimates and are
/// never sent to the backend; `predictor.run` is the authoritative path.
fn handle_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subjects = semester_subjects(state.semester).unwrap_or(&[]);
    let average = average_mark(&state.marks, subjects);
    let streak = longest_streak(&state.board.board);
    let completion = completion_percent(&state.board.board);
    let score = performance_score(average, streak, completion);
    let risk = score_risk_category(score);
    let features = json!([
        { "label": "Study Hours", "value": format!("{} hrs/day", state.inputs.study_hours) },
        { "label": "Attendance", "value": format!("{}%", state.inputs.attendance) },
        { "label": "Assignments", "value": format!("{}%", state.inputs.assignments_score) },
        { "label": "Past Marks", "value": format!("{}%", state.inputs.past_marks) },
        { "label": "Engagement", "value": format!("{}/10", state.inputs.engagement_score) },
        { "label": "Task Completion", "value": format!("{}% weekly", completion) },
    ]);

    ok(
        &req.id,
        json!({
            "source": "local-estimate",
            "performanceScore": score,
            "confidenceEstimate": confidence_estimate(&state.inputs),
            "riskCategory": risk,
            "passHint": pass_hint(score),
            "actionTip": action_tip(risk),
            "averageMark": average,
            "longestStreak": streak,
            "completionPercent": completion,
            "inputs": &state.inputs,
            "features": features
        }),
    )
}

fn handle_run(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(backend) = state.backend.as_mut() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.create_prediction(&state.inputs) {
        Ok(prediction) => ok(&req.id, json!({ "prediction": prediction_json(&prediction) })),
        Err(_) => err(
            &req.id,
            "backend_error",
            "Unable to run prediction. Please try again.",
            None,
        ),
    }
}

fn handle_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(10) as usize;
    let Some(backend) = state.backend.as_ref() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.my_predictions(limit) {
        Ok(predictions) => {
            let rows: Vec<serde_json::Value> = predictions.iter().map(prediction_json).collect();
            ok(&req.id, json!({ "predictions": rows }))
        }
        Err(_) => err(
            &req.id,
            "backend_error",
            "Unable to load prediction history.",
            None,
        ),
    }
}

fn handle_model_info(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(backend) = state.backend.as_ref() else {
        return err(&req.id, "no_session", "call session.init first", None);
    };
    match backend.model_info() {
        Ok(info) => ok(&req.id, json!({ "model": info })),
        Err(_) => err(
            &req.id,
            "backend_error",
            "Unable to load model information.",
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "predictor.setInputs" => Some(handle_set_inputs(state, req)),
        "predictor.summary" => Some(handle_summary(state, req)),
        "predictor.run" => Some(handle_run(state, req)),
        "predictor.history" => Some(handle_history(state, req)),
        "model.info" => Some(handle_model_info(state, req)),
        _ => None,
    }
}
