mod test_support;

use serde_json::json;
use std::io::Write;
use test_support::{init_demo, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("studyboard-router-smoke");
    let bundle_out = workspace.join("smoke-snapshot.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());

    init_demo(&mut stdin, &mut reader);

    let registered = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "auth.register",
        json!({
            "email": "smoke@school.test",
            "password": "longenough",
            "fullName": "Smoke Tester",
            "role": "student"
        }),
    );
    assert!(registered
        .get("accessToken")
        .and_then(|v| v.as_str())
        .map(|t| t.starts_with("demo-"))
        .unwrap_or(false));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "tasks.openWeek",
        json!({ "weekStart": "2026-01-05" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "tasks.summary", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "5", "tasks.sync", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "6", "marks.summary", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "marks.selectSemester",
        json!({ "semester": 2 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "predictor.summary",
        json!({}),
    );
    let _ = request_ok(&mut stdin, &mut reader, "9", "predictor.run", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "predictor.history",
        json!({ "limit": 5 }),
    );
    let model = request_ok(&mut stdin, &mut reader, "11", "model.info", json!({}));
    assert!(model.pointer("/model/algorithm").is_some());

    let roster = request_ok(&mut stdin, &mut reader, "12", "roster.open", json!({}));
    assert_eq!(roster.get("demo").and_then(|v| v.as_bool()), Some(true));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "all" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "14", "sections.list", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "15", "reading.status", json!({}));

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "snapshot.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(
        exported.get("bundleFormat").and_then(|v| v.as_str()),
        Some("studyboard-snapshot-v1")
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "snapshot.import",
        json!({ "inPath": bundle_out.to_string_lossy() }),
    );

    let _ = request_ok(&mut stdin, &mut reader, "18", "auth.logout", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "session.teardown",
        json!({}),
    );

    // Unknown methods fall through every family to not_implemented.
    let payload = json!({ "id": "20", "method": "no.suchMethod", "params": {} });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    std::io::BufRead::read_line(&mut reader, &mut line).expect("read response");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response");
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
