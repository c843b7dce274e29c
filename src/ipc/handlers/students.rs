use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    check_timestamp, get_nullable_str, get_opt_str, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, NewStudent, StudentPatch};

fn required_trimmed(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?.trim().to_string();
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

fn opt_trimmed(params: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match get_opt_str(params, key) {
        Some(v) => {
            let t = v.trim().to_string();
            if t.is_empty() {
                return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
            }
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let students = match get_opt_str(params, "classId") {
        Some(class_id) => store::students_for_class(conn, &class_id)?,
        None => store::students_all(conn)?,
    };
    Ok(json!({ "students": students }))
}

fn students_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let Some(student) = store::student_by_id(conn, &student_id)? else {
        return Err(HandlerErr::not_found("student"));
    };
    Ok(json!({ "student": student }))
}

fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let name = required_trimmed(params, "name")?;
    let email = required_trimmed(params, "email")?;
    let student_no = required_trimmed(params, "studentNo")?;
    if !store::class_exists(conn, &class_id)? {
        return Err(HandlerErr::not_found("class"));
    }

    let enrollment_date = match get_opt_str(params, "enrollmentDate") {
        Some(v) => {
            check_timestamp(&v, "enrollmentDate")?;
            v
        }
        None => Utc::now().to_rfc3339(),
    };

    let student = store::create_student(
        conn,
        NewStudent {
            class_id,
            name,
            email,
            student_no,
            photo: get_opt_str(params, "photo"),
            enrollment_date,
        },
    )?;
    Ok(json!({ "student": student }))
}

fn students_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;

    let class_id = get_opt_str(params, "classId");
    if let Some(ref cid) = class_id {
        if !store::class_exists(conn, cid)? {
            return Err(HandlerErr::not_found("class"));
        }
    }
    let enrollment_date = match get_opt_str(params, "enrollmentDate") {
        Some(v) => {
            check_timestamp(&v, "enrollmentDate")?;
            Some(v)
        }
        None => None,
    };

    let patch = StudentPatch {
        class_id,
        name: opt_trimmed(params, "name")?,
        email: opt_trimmed(params, "email")?,
        student_no: opt_trimmed(params, "studentNo")?,
        photo: get_nullable_str(params, "photo")?,
        enrollment_date,
    };
    let student = store::update_student(conn, &student_id, patch)?;
    Ok(json!({ "student": student }))
}

fn students_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let student = store::delete_student(conn, &student_id)?;
    Ok(json!({ "student": student }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_list(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_get(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match students_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
