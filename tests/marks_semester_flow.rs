mod test_support;

use serde_json::json;
use test_support::{init_demo, request_err, request_ok, spawn_sidecar};

#[test]
fn marks_clamp_aggregate_and_retain_across_semesters() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_demo(&mut stdin, &mut reader);

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "marks.set",
        json!({ "subject": "Engineering Physics", "mark": 150 }),
    );
    assert_eq!(set.get("mark").and_then(|v| v.as_i64()), Some(100));
    assert_eq!(set.get("tier").and_then(|v| v.as_str()), Some("High"));

    let set = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "marks.set",
        json!({ "subject": "Engineering Physics", "mark": -50 }),
    );
    assert_eq!(set.get("mark").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(set.get("tier").and_then(|v| v.as_str()), Some("Backlog"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "marks.set",
        json!({ "subject": "Engineering Physics", "mark": 35 }),
    );

    // Four untouched subjects at the default 75 plus one at 35.
    let summary = request_ok(&mut stdin, &mut reader, "4", "marks.summary", json!({}));
    assert_eq!(summary.get("averageMark").and_then(|v| v.as_i64()), Some(67));
    assert_eq!(
        summary.get("backlogSubjects").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );
    assert_eq!(summary.get("persisted").and_then(|v| v.as_bool()), Some(false));

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "marks.selectSemester",
        json!({ "semester": 3 }),
    );
    assert_eq!(
        selected.get("subjects").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(6)
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "marks.set",
        json!({ "subject": "Data Structures", "mark": 91 }),
    );

    // Semester-3 backlog never includes semester-1 subjects.
    let summary = request_ok(&mut stdin, &mut reader, "7", "marks.summary", json!({}));
    assert_eq!(
        summary.get("backlogSubjects").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
    assert_eq!(summary.get("averageMark").and_then(|v| v.as_i64()), Some(78));

    // Retain policy: switching back restores the earlier mark.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "marks.selectSemester",
        json!({ "semester": 1 }),
    );
    let summary = request_ok(&mut stdin, &mut reader, "9", "marks.summary", json!({}));
    let physics = summary
        .get("subjects")
        .and_then(|v| v.as_array())
        .and_then(|rows| {
            rows.iter()
                .find(|r| r.get("subject").and_then(|s| s.as_str()) == Some("Engineering Physics"))
        })
        .cloned()
        .expect("physics row");
    assert_eq!(physics.get("mark").and_then(|v| v.as_i64()), Some(35));
    assert_eq!(physics.get("tier").and_then(|v| v.as_str()), Some("Backlog"));

    // The per-semester trend sees both semesters' current values.
    let averages = summary
        .get("semesterAverages")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("semester averages");
    assert_eq!(averages.len(), 4);
    assert_eq!(averages[0].get("average").and_then(|v| v.as_i64()), Some(67));
    assert_eq!(averages[2].get("average").and_then(|v| v.as_i64()), Some(78));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn mark_writes_validate_semester_scope() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    init_demo(&mut stdin, &mut reader);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "marks.selectSemester",
        json!({ "semester": 9 }),
    );
    assert_eq!(code, "bad_params");

    // Semester 1 is active; a semester-3 subject is out of scope.
    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "marks.set",
        json!({ "subject": "Data Structures", "mark": 80 }),
    );
    assert_eq!(code, "bad_params");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "marks.set",
        json!({ "subject": "Engineering Physics" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
}
