use chrono::{Datelike, Utc};
use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_opt_i64, get_opt_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, ClassPatch, NewClass};

fn classes_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let rows = store::classes_with_student_counts(conn)?;
    let classes = rows
        .into_iter()
        .map(|(class, student_count)| {
            json!({
                "id": class.id,
                "name": class.name,
                "code": class.code,
                "semester": class.semester,
                "year": class.year,
                "studentCount": student_count,
            })
        })
        .collect::<Vec<_>>();
    Ok(json!({ "classes": classes }))
}

fn classes_get(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let Some(class) = store::class_by_id(conn, &class_id)? else {
        return Err(HandlerErr::not_found("class"));
    };
    Ok(json!({ "class": class }))
}

fn classes_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let code = get_opt_str(params, "code").unwrap_or_default();
    let semester = get_opt_str(params, "semester").unwrap_or_default();
    let year = get_opt_i64(params, "year").unwrap_or_else(|| Utc::now().year() as i64);

    let class = store::create_class(
        conn,
        NewClass {
            name,
            code,
            semester,
            year,
        },
    )?;
    Ok(json!({ "class": class }))
}

fn classes_update(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
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
    let patch = ClassPatch {
        name,
        code: get_opt_str(params, "code"),
        semester: get_opt_str(params, "semester"),
        year: get_opt_i64(params, "year"),
    };
    let class = store::update_class(conn, &class_id, patch)?;
    Ok(json!({ "class": class }))
}

fn classes_delete(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let class = store::delete_class(conn, &class_id)?;
    Ok(json!({ "class": class }))
}

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match classes_list(conn) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match classes_get(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match classes_create(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match classes_update(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match classes_delete(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.get" => Some(handle_classes_get(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        _ => None,
    }
}
