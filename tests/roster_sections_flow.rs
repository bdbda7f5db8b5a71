mod test_support;

use serde_json::json;
use test_support::{init_demo, request_err, request_ok, spawn_sidecar};

#[test]
fn roster_loads_filters_and_edits_students() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_demo(&mut stdin, &mut reader);

    let opened = request_ok(&mut stdin, &mut reader, "1", "roster.open", json!({}));
    assert_eq!(opened.get("demo").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        opened.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(3)
    );
    assert_eq!(
        opened
            .pointer("/analytics/totalStudents")
            .and_then(|v| v.as_i64()),
        Some(3)
    );
    assert_eq!(
        opened
            .pointer("/analytics/riskDistribution/highRisk")
            .and_then(|v| v.as_i64()),
        Some(1)
    );

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "all" }),
    );
    let rows = all.get("students").and_then(|v| v.as_array()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0].get("studentId").and_then(|v| v.as_str()),
        Some("ST101")
    );
    assert_eq!(
        rows[2].get("studentId").and_then(|v| v.as_str()),
        Some("ST103")
    );

    let high = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "High" }),
    );
    let rows = high.get("students").and_then(|v| v.as_array()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name").and_then(|v| v.as_str()),
        Some("Asha Patel")
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "roster.filter",
        json!({ "year": 2, "risk": "Severe" }),
    );
    assert_eq!(code, "bad_params");

    // Student create rejects a partial submission outright.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "students.create",
        json!({ "studentId": "ST104", "name": "Dev Narayan", "year": 2 }),
    );
    assert_eq!(code, "bad_params");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({
            "studentId": "ST104",
            "name": "Dev Narayan",
            "email": "dev@school.com",
            "className": "CS101",
            "year": 2
        }),
    );
    // Section defaults to the selected one.
    assert_eq!(
        created.pointer("/student/section").and_then(|v| v.as_str()),
        Some("A")
    );
    let new_id = created
        .pointer("/student/id")
        .and_then(|v| v.as_i64())
        .expect("new student id");

    let all = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "all" }),
    );
    assert_eq!(all.get("count").and_then(|v| v.as_i64()), Some(4));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "students.update",
        json!({
            "id": new_id,
            "studentId": "ST104",
            "name": "Dev N. Narayan",
            "email": "dev@school.com",
            "className": "CS101",
            "year": 2,
            "section": "A"
        }),
    );
    let all = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "all" }),
    );
    let rows = all.get("students").and_then(|v| v.as_array()).unwrap();
    assert!(rows
        .iter()
        .any(|r| r.get("name").and_then(|v| v.as_str()) == Some("Dev N. Narayan")));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "students.delete",
        json!({ "id": new_id }),
    );
    let all = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "roster.filter",
        json!({ "year": 2, "section": "A", "risk": "all" }),
    );
    assert_eq!(all.get("count").and_then(|v| v.as_i64()), Some(3));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "students.delete",
        json!({ "id": 999 }),
    );
    assert_eq!(code, "backend_error");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn section_lifecycle_keeps_its_invariants() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_demo(&mut stdin, &mut reader);

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "sections.add",
        json!({ "name": "  b " }),
    );
    assert_eq!(added.get("added").and_then(|v| v.as_str()), Some("B"));
    assert_eq!(added.get("selected").and_then(|v| v.as_str()), Some("B"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "sections.add",
        json!({ "name": "b" }),
    );
    assert_eq!(code, "duplicate_section");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "sections.add",
        json!({ "name": "   " }),
    );
    assert_eq!(code, "bad_params");

    // Removing the selected section reassigns selection.
    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "sections.remove",
        json!({ "name": "B" }),
    );
    assert_eq!(removed.get("selected").and_then(|v| v.as_str()), Some("A"));

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "sections.remove",
        json!({ "name": "A" }),
    );
    assert_eq!(code, "last_section");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "sections.select",
        json!({ "name": "Z" }),
    );
    assert_eq!(code, "not_found");

    drop(stdin);
    let _ = child.wait();
}
