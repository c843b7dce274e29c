mod test_support;

use serde_json::json;
use test_support::{expect_err, request, request_ok, spawn_sidecar, temp_dir};

struct Fixture {
    class_id: String,
    student_id: String,
    assignment_id: String,
}

fn seed(
    stdin: &mut std::process::ChildStdin,
    reader: &mut std::io::BufReader<std::process::ChildStdout>,
    workspace: &std::path::Path,
) -> Fixture {
    let _ = request_ok(
        stdin,
        reader,
        "seed-1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        stdin,
        reader,
        "seed-2",
        "classes.create",
        json!({ "name": "Algebra I" }),
    );
    let class_id = created
        .get("class")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("class id")
        .to_string();
    let created = request_ok(
        stdin,
        reader,
        "seed-3",
        "students.create",
        json!({
            "classId": class_id,
            "name": "Ada Park",
            "email": "ada@school.edu",
            "studentNo": "STU-A"
        }),
    );
    let student_id = created
        .get("student")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("student id")
        .to_string();
    let created = request_ok(
        stdin,
        reader,
        "seed-4",
        "assignments.create",
        json!({ "classId": class_id, "name": "Quiz 1" }),
    );
    let assignment_id = created
        .get("assignment")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("assignment id")
        .to_string();
    Fixture {
        class_id,
        student_id,
        assignment_id,
    }
}

#[test]
fn grade_values_are_checked_on_create() {
    let workspace = temp_dir("classhub-grade-create");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let fx = seed(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 42.0,
            "maxScore": 50.0
        }),
    );
    let grade = created.get("grade").expect("grade");
    assert_eq!(grade.get("score").and_then(|v| v.as_f64()), Some(42.0));
    assert!(
        !grade
            .get("submittedDate")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .is_empty(),
        "submittedDate defaults to now"
    );

    let over = request(
        &mut stdin,
        &mut reader,
        "2",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 60.0,
            "maxScore": 50.0
        }),
    );
    expect_err(&over, "bad_params");

    let negative = request(
        &mut stdin,
        &mut reader,
        "3",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": -1.0,
            "maxScore": 50.0
        }),
    );
    expect_err(&negative, "bad_params");

    let zero_max = request(
        &mut stdin,
        &mut reader,
        "4",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 0.0,
            "maxScore": 0.0
        }),
    );
    expect_err(&zero_max, "bad_params");

    let ghost_student = request(
        &mut stdin,
        &mut reader,
        "5",
        "grades.create",
        json!({
            "studentId": "no-such-student",
            "assignmentId": fx.assignment_id,
            "score": 10.0,
            "maxScore": 20.0
        }),
    );
    expect_err(&ghost_student, "not_found");

    let ghost_assignment = request(
        &mut stdin,
        &mut reader,
        "6",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": "no-such-assignment",
            "score": 10.0,
            "maxScore": 20.0
        }),
    );
    expect_err(&ghost_assignment, "not_found");

    let bad_stamp = request(
        &mut stdin,
        &mut reader,
        "7",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 10.0,
            "maxScore": 20.0,
            "submittedDate": "yesterday"
        }),
    );
    expect_err(&bad_stamp, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn grade_update_checks_the_merged_row() {
    let workspace = temp_dir("classhub-grade-update");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let fx = seed(&mut stdin, &mut reader, &workspace);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 80.0,
            "maxScore": 100.0
        }),
    );
    let grade_id = created
        .get("grade")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("grade id")
        .to_string();

    // A new score is checked against the stored maxScore, not in isolation.
    let over = request(
        &mut stdin,
        &mut reader,
        "2",
        "grades.update",
        json!({ "gradeId": grade_id, "score": 120.0 }),
    );
    expect_err(&over, "bad_params");

    // Shrinking maxScore below the stored score fails the same way.
    let shrunk = request(
        &mut stdin,
        &mut reader,
        "3",
        "grades.update",
        json!({ "gradeId": grade_id, "maxScore": 50.0 }),
    );
    expect_err(&shrunk, "bad_params");

    // Raising both together is fine when the pair is consistent.
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.update",
        json!({ "gradeId": grade_id, "score": 120.0, "maxScore": 150.0 }),
    );
    let grade = updated.get("grade").expect("grade");
    assert_eq!(grade.get("score").and_then(|v| v.as_f64()), Some(120.0));
    assert_eq!(grade.get("maxScore").and_then(|v| v.as_f64()), Some(150.0));

    let missing = request(
        &mut stdin,
        &mut reader,
        "5",
        "grades.update",
        json!({ "gradeId": "no-such-grade", "score": 5.0 }),
    );
    expect_err(&missing, "not_found");

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.delete",
        json!({ "gradeId": grade_id }),
    );
    assert_eq!(
        removed
            .get("grade")
            .and_then(|v| v.get("id"))
            .and_then(|v| v.as_str()),
        Some(grade_id.as_str())
    );
    let gone = request(
        &mut stdin,
        &mut reader,
        "7",
        "grades.delete",
        json!({ "gradeId": grade_id }),
    );
    expect_err(&gone, "not_found");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn grade_listing_requires_a_scope() {
    let workspace = temp_dir("classhub-grade-list");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let fx = seed(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.create",
        json!({
            "studentId": fx.student_id,
            "assignmentId": fx.assignment_id,
            "score": 9.0,
            "maxScore": 10.0
        }),
    );

    let by_student = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.list",
        json!({ "studentId": fx.student_id }),
    );
    assert_eq!(
        by_student
            .get("grades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let by_class = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.list",
        json!({ "classId": fx.class_id }),
    );
    assert_eq!(
        by_class
            .get("grades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    let unscoped = request(&mut stdin, &mut reader, "4", "grades.list", json!({}));
    expect_err(&unscoped, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn assignment_writes_validate_weight_points_and_due_date() {
    let workspace = temp_dir("classhub-assignment-validate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let fx = seed(&mut stdin, &mut reader, &workspace);

    // seed() already made one assignment with nothing but a name.
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "assignments.list",
        json!({ "classId": fx.class_id }),
    );
    let first = &listed.get("assignments").and_then(|v| v.as_array()).expect("assignments")[0];
    assert_eq!(first.get("weight").and_then(|v| v.as_f64()), Some(1.0));
    assert_eq!(first.get("totalPoints").and_then(|v| v.as_f64()), Some(100.0));
    assert_eq!(first.get("category").and_then(|v| v.as_str()), Some(""));
    assert!(first.get("dueDate").map(|v| v.is_null()).unwrap_or(false));

    let bad_weight = request(
        &mut stdin,
        &mut reader,
        "2",
        "assignments.create",
        json!({ "classId": fx.class_id, "name": "Quiz 2", "weight": -0.5 }),
    );
    expect_err(&bad_weight, "bad_params");

    let bad_points = request(
        &mut stdin,
        &mut reader,
        "3",
        "assignments.create",
        json!({ "classId": fx.class_id, "name": "Quiz 2", "totalPoints": 0 }),
    );
    expect_err(&bad_points, "bad_params");

    let bad_due = request(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "classId": fx.class_id, "name": "Quiz 2", "dueDate": "next friday" }),
    );
    expect_err(&bad_due, "bad_params");

    let assignment_id = first
        .get("id")
        .and_then(|v| v.as_str())
        .expect("assignment id")
        .to_string();
    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "assignments.update",
        json!({
            "assignmentId": assignment_id,
            "category": "quizzes",
            "dueDate": "2025-10-03"
        }),
    );
    let assignment = updated.get("assignment").expect("assignment");
    assert_eq!(
        assignment.get("category").and_then(|v| v.as_str()),
        Some("quizzes")
    );
    assert_eq!(
        assignment.get("dueDate").and_then(|v| v.as_str()),
        Some("2025-10-03")
    );

    // Explicit null clears the due date again.
    let cleared = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "assignments.update",
        json!({ "assignmentId": assignment_id, "dueDate": null }),
    );
    assert!(cleared
        .get("assignment")
        .and_then(|v| v.get("dueDate"))
        .map(|v| v.is_null())
        .unwrap_or(false));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "assignments.delete",
        json!({ "assignmentId": assignment_id }),
    );
    assert_eq!(
        removed
            .get("assignment")
            .and_then(|v| v.get("id"))
            .and_then(|v| v.as_str()),
        Some(assignment_id.as_str())
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
