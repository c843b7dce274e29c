mod test_support;

use serde_json::json;
use test_support::{expect_err, request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn deleting_a_class_removes_only_the_class_row() {
    let workspace = temp_dir("classhub-class-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "classes.create",
        json!({ "name": "History", "code": "HIS-101", "semester": "Fall", "year": 2025 }),
    );
    let class = created.get("class").expect("class");
    assert_eq!(class.get("year").and_then(|v| v.as_i64()), Some(2025));
    let class_id = class
        .get("id")
        .and_then(|v| v.as_str())
        .expect("class id")
        .to_string();

    let mut student_ids = Vec::new();
    for (i, name) in ["Ada Park", "Ben Okafor"].iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({
                "classId": class_id,
                "name": name,
                "email": format!("s{}@school.edu", i),
                "studentNo": format!("STU-{}", i)
            }),
        );
        student_ids.push(
            created
                .get("student")
                .and_then(|v| v.get("id"))
                .and_then(|v| v.as_str())
                .expect("student id")
                .to_string(),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.bulkMark",
        json!({ "classId": class_id, "date": "2025-09-01", "studentIds": student_ids }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "assignments.create",
        json!({ "classId": class_id, "name": "Essay 1" }),
    );
    let assignment_id = created
        .get("assignment")
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .expect("assignment id")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.create",
        json!({
            "studentId": student_ids[0],
            "assignmentId": assignment_id,
            "score": 88.0,
            "maxScore": 100.0
        }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "6", "classes.list", json!({}));
    let classes = listed.get("classes").and_then(|v| v.as_array()).expect("classes");
    assert_eq!(classes.len(), 1);
    assert_eq!(
        classes[0].get("studentCount").and_then(|v| v.as_i64()),
        Some(2)
    );

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "classes.delete",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        removed
            .get("class")
            .and_then(|v| v.get("id"))
            .and_then(|v| v.as_str()),
        Some(class_id.as_str())
    );

    let gone = request(
        &mut stdin,
        &mut reader,
        "8",
        "classes.get",
        json!({ "classId": class_id }),
    );
    expect_err(&gone, "not_found");

    // Nothing cascades: roster, attendance, assignments, and grades all
    // stay behind with their old classId.
    let students = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        students
            .get("students")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(2)
    );
    let attendance = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        attendance
            .get("records")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(2)
    );
    let assignments = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "assignments.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        assignments
            .get("assignments")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );
    let grades = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "grades.list",
        json!({ "studentId": student_ids[0] }),
    );
    assert_eq!(
        grades
            .get("grades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    // The dashboard bundle needs the class row, but raw stats are computed
    // from whatever references remain.
    let opened = request(
        &mut stdin,
        &mut reader,
        "13",
        "dashboard.open",
        json!({ "classId": class_id }),
    );
    expect_err(&opened, "not_found");
    let stats = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "dashboard.classStats",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        stats
            .get("stats")
            .and_then(|v| v.get("totalStudents"))
            .and_then(|v| v.as_i64()),
        Some(2)
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
