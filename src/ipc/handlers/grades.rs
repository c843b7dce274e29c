use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    check_date, check_grade_values, check_timestamp, get_nullable_str, get_opt_f64, get_opt_i64,
    get_opt_str, get_required_f64, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::metrics;
use crate::store::{self, AssignmentPatch, GradePatch, NewAssignment, NewGrade};

const RECENT_LIMIT: i64 = 20;

fn grades_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    if let Some(student_id) = get_opt_str(params, "studentId") {
        let grades = store::grades_for_student(conn, &student_id)?;
        return Ok(json!({ "grades": grades }));
    }
    if let Some(class_id) = get_opt_str(params, "classId") {
        let grades = store::grades_for_class_students(conn, &class_id)?;
        return Ok(json!({ "grades": grades }));
    }
    Err(HandlerErr::bad_params("missing studentId or classId"))
}

fn grades_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let assignment_id = get_required_str(params, "assignmentId")?;
    let score = get_required_f64(params, "score")?;
    let max_score = get_required_f64(params, "maxScore")?;
    check_grade_values(score, max_score)?;

    if !store::student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student"));
    }
    if !store::assignment_exists(conn, &assignment_id)? {
        return Err(HandlerErr::not_found("assignment"));
    }

    let submitted_date = match get_opt_str(params, "submittedDate") {
        Some(v) => {
            check_timestamp(&v, "submittedDate")?;
            v
        }
        None => Utc::now().to_rfc3339(),
    };

    let grade = store::create_grade(
        conn,
        NewGrade {
            student_id,
            assignment_id,
            score,
            max_score,
            submitted_date,
        },
    )?;
    Ok(json!({ "grade": grade }))
}

fn grades_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let score = get_opt_f64(params, "score");
    let max_score = get_opt_f64(params, "maxScore");
    let submitted_date = match get_opt_str(params, "submittedDate") {
        Some(v) => {
            check_timestamp(&v, "submittedDate")?;
            Some(v)
        }
        None => None,
    };

    // Bounds hold for the merged row, not just the fields being changed.
    if score.is_some() || max_score.is_some() {
        let Some(current) = store::grade_by_id(conn, &grade_id)? else {
            return Err(HandlerErr::not_found("grade"));
        };
        check_grade_values(
            score.unwrap_or(current.score),
            max_score.unwrap_or(current.max_score),
        )?;
    }

    let grade = store::update_grade(
        conn,
        &grade_id,
        GradePatch {
            score,
            max_score,
            submitted_date,
        },
    )?;
    Ok(json!({ "grade": grade }))
}

fn grades_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let grade_id = get_required_str(params, "gradeId")?;
    let grade = store::delete_grade(conn, &grade_id)?;
    Ok(json!({ "grade": grade }))
}

fn grades_recent(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let limit = get_opt_i64(params, "limit").unwrap_or(RECENT_LIMIT);
    if limit <= 0 {
        return Err(HandlerErr::bad_params("limit must be positive"));
    }
    let records = store::grades_recent(conn, &class_id, limit)?;
    let students = store::students_all(conn)?;
    let assignments = store::assignments_all(conn)?;

    let rows = records
        .into_iter()
        .map(|grade| {
            let percent = metrics::round_percent(metrics::grade_percent(&grade));
            json!({
                "id": grade.id,
                "studentId": grade.student_id,
                "studentName": metrics::student_name(&students, &grade.student_id),
                "assignmentId": grade.assignment_id,
                "assignmentName": metrics::assignment_name(&assignments, &grade.assignment_id),
                "score": grade.score,
                "maxScore": grade.max_score,
                "percent": percent,
                "submittedDate": grade.submitted_date,
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({ "grades": rows }))
}

fn assignments_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let assignments = match get_opt_str(params, "classId") {
        Some(class_id) => store::assignments_for_class(conn, &class_id)?,
        None => store::assignments_all(conn)?,
    };
    Ok(json!({ "assignments": assignments }))
}

fn assignments_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    if !store::class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class"));
    }

    let weight = get_opt_f64(params, "weight").unwrap_or(1.0);
    if weight < 0.0 {
        return Err(HandlerErr::bad_params("weight must not be negative"));
    }
    let total_points = get_opt_f64(params, "totalPoints").unwrap_or(100.0);
    if total_points <= 0.0 {
        return Err(HandlerErr::bad_params("totalPoints must be positive"));
    }
    let due_date = get_opt_str(params, "dueDate");
    if let Some(ref d) = due_date {
        check_date(d, "dueDate")?;
    }

    let assignment = store::create_assignment(
        conn,
        NewAssignment {
            class_id,
            name,
            category: get_opt_str(params, "category").unwrap_or_default(),
            weight,
            due_date,
            total_points,
        },
    )?;
    Ok(json!({ "assignment": assignment }))
}

fn assignments_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let name = match get_opt_str(params, "name") {
        Some(v) => {
            let t = v.trim().to_string();
            if t.is_empty() {
                return Err(HandlerErr::bad_params("name must not be empty"));
            }
            Some(t)
        }
        None => None,
    };
    let weight = get_opt_f64(params, "weight");
    if let Some(w) = weight {
        if w < 0.0 {
            return Err(HandlerErr::bad_params("weight must not be negative"));
        }
    }
    let total_points = get_opt_f64(params, "totalPoints");
    if let Some(tp) = total_points {
        if tp <= 0.0 {
            return Err(HandlerErr::bad_params("totalPoints must be positive"));
        }
    }
    let due_date = get_nullable_str(params, "dueDate")?;
    if let Some(Some(ref d)) = due_date {
        check_date(d, "dueDate")?;
    }

    let assignment = store::update_assignment(
        conn,
        &assignment_id,
        AssignmentPatch {
            name,
            category: get_opt_str(params, "category"),
            weight,
            due_date,
            total_points,
        },
    )?;
    Ok(json!({ "assignment": assignment }))
}

fn assignments_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let assignment_id = get_required_str(params, "assignmentId")?;
    let assignment = store::delete_assignment(conn, &assignment_id)?;
    Ok(json!({ "assignment": assignment }))
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match grades_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_grades_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match grades_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_grades_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match grades_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match grades_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_grades_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match grades_recent(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match assignments_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match assignments_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match assignments_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match assignments_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.list" => Some(handle_grades_list(state, req)),
        "grades.create" => Some(handle_grades_create(state, req)),
        "grades.update" => Some(handle_grades_update(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        "grades.recent" => Some(handle_grades_recent(state, req)),
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        _ => None,
    }
}
