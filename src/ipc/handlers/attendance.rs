use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    check_date, check_status, get_opt_i64, get_opt_str, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::metrics;
use crate::store::{self, AttendancePatch, NewAttendanceRecord};

const RECENT_LIMIT: i64 = 20;

fn attendance_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let student_id = get_opt_str(params, "studentId");
    let date = get_opt_str(params, "date");
    if let Some(ref d) = date {
        check_date(d, "date")?;
    }
    let records = store::attendance_list(conn, &class_id, student_id.as_deref(), date.as_deref())?;
    Ok(json!({ "records": records }))
}

fn attendance_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let class_id = get_required_str(params, "classId")?;
    let date = get_required_str(params, "date")?;
    check_date(&date, "date")?;
    let status = get_required_str(params, "status")?;
    check_status(&status)?;
    let notes = get_opt_str(params, "notes").unwrap_or_default();

    if !store::class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class"));
    }
    if !store::student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student"));
    }

    // The class is frozen at time-of-record: moving the student to another
    // class later does not rewrite this row.
    let record = store::create_attendance(
        conn,
        NewAttendanceRecord {
            student_id,
            class_id,
            date,
            status,
            notes,
        },
    )?;
    Ok(json!({ "record": record }))
}

fn attendance_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let record_id = get_required_str(params, "recordId")?;
    let date = get_opt_str(params, "date");
    if let Some(ref d) = date {
        check_date(d, "date")?;
    }
    let status = get_opt_str(params, "status");
    if let Some(ref s) = status {
        check_status(s)?;
    }
    let patch = AttendancePatch {
        date,
        status,
        notes: get_opt_str(params, "notes"),
    };
    let record = store::update_attendance(conn, &record_id, patch)?;
    Ok(json!({ "record": record }))
}

fn attendance_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let record_id = get_required_str(params, "recordId")?;
    let record = store::delete_attendance(conn, &record_id)?;
    Ok(json!({ "record": record }))
}

fn mark_one(
    conn: &Connection,
    student_id: &str,
    class_id: &str,
    date: &str,
    status: &str,
    notes: &str,
) -> Result<store::AttendanceRecord, HandlerErr> {
    if !store::student_exists(conn, student_id)? {
        return Err(HandlerErr::not_found("student"));
    }
    Ok(store::create_attendance(
        conn,
        NewAttendanceRecord {
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            date: date.to_string(),
            status: status.to_string(),
            notes: notes.to_string(),
        },
    )?)
}

/// Best-effort batch: one insert per student, no transaction, no rollback.
/// Rows written before a failure stay written; the reply reports the
/// aggregate outcome either way.
fn attendance_bulk_mark(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let date = get_required_str(params, "date")?;
    check_date(&date, "date")?;
    let status = get_opt_str(params, "status").unwrap_or_else(|| "present".to_string());
    check_status(&status)?;
    let notes = get_opt_str(params, "notes").unwrap_or_default();

    let Some(ids) = params.get("studentIds").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("missing studentIds"));
    };
    let student_ids: Vec<String> = ids
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    if student_ids.len() != ids.len() {
        return Err(HandlerErr::bad_params("studentIds must be strings"));
    }
    if student_ids.is_empty() {
        return Err(HandlerErr::bad_params("studentIds must not be empty"));
    }
    if !store::class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class"));
    }

    let mut created = Vec::new();
    let mut failures = Vec::new();
    for student_id in &student_ids {
        match mark_one(conn, student_id, &class_id, &date, &status, &notes) {
            Ok(record) => created.push(record),
            Err(e) => failures.push(json!({
                "studentId": student_id,
                "code": e.code,
                "message": e.message,
            })),
        }
    }

    if !failures.is_empty() {
        return Err(HandlerErr {
            code: "batch_failed",
            message: format!(
                "{} of {} attendance rows failed",
                failures.len(),
                student_ids.len()
            ),
            details: Some(json!({
                "requested": student_ids.len(),
                "created": created,
                "failures": failures,
            })),
        });
    }

    Ok(json!({ "records": created, "marked": created.len() }))
}

fn attendance_recent(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let limit = get_opt_i64(params, "limit").unwrap_or(RECENT_LIMIT);
    if limit <= 0 {
        return Err(HandlerErr::bad_params("limit must be positive"));
    }
    let records = store::attendance_recent(conn, &class_id, limit)?;
    let students = store::students_all(conn)?;

    // Rows may outlive their student; show the sentinel instead of hiding
    // the row.
    let rows = records
        .into_iter()
        .map(|record| {
            json!({
                "id": record.id,
                "studentId": record.student_id,
                "studentName": metrics::student_name(&students, &record.student_id),
                "date": record.date,
                "status": record.status,
                "notes": record.notes,
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({ "records": rows }))
}

fn handle_attendance_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_bulk_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_bulk_mark(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_attendance_recent(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match attendance_recent(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.list" => Some(handle_attendance_list(state, req)),
        "attendance.create" => Some(handle_attendance_create(state, req)),
        "attendance.update" => Some(handle_attendance_update(state, req)),
        "attendance.delete" => Some(handle_attendance_delete(state, req)),
        "attendance.bulkMark" => Some(handle_attendance_bulk_mark(state, req)),
        "attendance.recent" => Some(handle_attendance_recent(state, req)),
        _ => None,
    }
}
