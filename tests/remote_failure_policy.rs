mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar};

// Nothing listens on port 1; every remote call fails fast. The daemon must
// fail locally, keep in-memory state, and never crash the session.
fn init_unreachable_remote(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
) {
    let result = request_ok(
        stdin,
        reader,
        "init",
        "session.init",
        json!({ "backend": { "mode": "remote", "baseUrl": "http://127.0.0.1:1" } }),
    );
    assert_eq!(result.get("mode").and_then(|v| v.as_str()), Some("remote"));
}

#[test]
fn failed_loads_and_syncs_preserve_the_local_board() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_unreachable_remote(&mut stdin, &mut reader);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "tasks.setText",
        json!({ "day": "Monday", "text": "Offline edit" }),
    );

    // Navigation with a dead remote reports the failure and keeps the
    // previous board visible.
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "tasks.openWeek",
        json!({ "weekStart": "2031-03-03" }),
    );
    assert_eq!(opened.get("loaded").and_then(|v| v.as_bool()), Some(false));
    assert!(opened.get("notice").and_then(|v| v.as_str()).is_some());
    let entries = opened.get("entries").and_then(|v| v.as_array()).unwrap();
    assert_eq!(
        entries[0].get("task").and_then(|v| v.as_str()),
        Some("Offline edit")
    );

    let code = request_err(&mut stdin, &mut reader, "3", "tasks.sync", json!({}));
    assert_eq!(code, "sync_failed");

    // The edit is still there after the failed sync.
    let summary = request_ok(&mut stdin, &mut reader, "4", "tasks.summary", json!({}));
    let entries = summary.get("entries").and_then(|v| v.as_array()).unwrap();
    assert_eq!(
        entries[0].get("task").and_then(|v| v.as_str()),
        Some("Offline edit")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn remote_failures_surface_as_generic_coded_errors() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_unreachable_remote(&mut stdin, &mut reader);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "auth.login",
        json!({ "email": "student@school.test", "password": "longenough" }),
    );
    assert_eq!(code, "auth_failed");

    let code = request_err(&mut stdin, &mut reader, "2", "roster.open", json!({}));
    assert_eq!(code, "backend_error");

    let code = request_err(&mut stdin, &mut reader, "3", "predictor.run", json!({}));
    assert_eq!(code, "backend_error");

    let code = request_err(&mut stdin, &mut reader, "4", "model.info", json!({}));
    assert_eq!(code, "backend_error");

    // The session itself is still alive and serving local state.
    let summary = request_ok(&mut stdin, &mut reader, "5", "marks.summary", json!({}));
    assert_eq!(summary.get("averageMark").and_then(|v| v.as_i64()), Some(75));

    drop(stdin);
    let _ = child.wait();
}
