use rusqlite::Connection;
use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::metrics;
use crate::store::{self, Snapshot};

const RECENT_LIMIT: usize = 20;

fn dashboard_class_stats(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let stats = match get_opt_str(params, "classId") {
        Some(class_id) => {
            let snap = Snapshot::load(conn)?;
            metrics::class_stats(&snap, &class_id)
        }
        None => metrics::ClassStats::empty(),
    };
    Ok(json!({ "stats": stats }))
}

fn dashboard_student_stats(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let class_id = get_required_str(params, "classId")?;
    if !store::student_exists(conn, &student_id)? {
        return Err(HandlerErr::not_found("student"));
    }
    let snap = Snapshot::load(conn)?;
    let stats = metrics::student_stats(&snap, &student_id, &class_id);
    let tier = metrics::classify(&stats);
    Ok(json!({ "stats": stats, "riskTier": tier }))
}

fn dashboard_cohorts(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let snap = Snapshot::load(conn)?;
    let stats: Vec<metrics::StudentStats> = metrics::class_roster(&snap.students, &class_id)
        .iter()
        .map(|s| metrics::student_stats(&snap, &s.id, &class_id))
        .collect();
    Ok(json!({
        "grades": metrics::grade_cohorts(&stats),
        "attendance": metrics::attendance_cohorts(&stats),
    }))
}

// Snapshot vectors arrive oldest-first; walking them backwards yields the
// newest-first feed order.
fn recent_attendance_rows(snap: &Snapshot, class_id: &str, limit: usize) -> Vec<serde_json::Value> {
    snap.attendance
        .iter()
        .rev()
        .filter(|r| r.class_id == class_id)
        .take(limit)
        .map(|record| {
            json!({
                "id": record.id,
                "studentId": record.student_id,
                "studentName": metrics::student_name(&snap.students, &record.student_id),
                "date": record.date,
                "status": record.status,
                "notes": record.notes,
            })
        })
        .collect()
}

// Unlike attendance, a grade only makes this feed while its student row
// exists and is on the class roster.
fn recent_grade_rows(snap: &Snapshot, class_id: &str, limit: usize) -> Vec<serde_json::Value> {
    snap.grades
        .iter()
        .rev()
        .filter(|g| {
            snap.students
                .iter()
                .any(|s| s.id == g.student_id && s.class_id == class_id)
        })
        .take(limit)
        .map(|grade| {
            let percent = metrics::round_percent(metrics::grade_percent(grade));
            json!({
                "id": grade.id,
                "studentId": grade.student_id,
                "studentName": metrics::student_name(&snap.students, &grade.student_id),
                "assignmentId": grade.assignment_id,
                "assignmentName": metrics::assignment_name(&snap.assignments, &grade.assignment_id),
                "score": grade.score,
                "maxScore": grade.max_score,
                "percent": percent,
                "submittedDate": grade.submitted_date,
            })
        })
        .collect()
}

fn dashboard_open(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let Some(class) = store::class_by_id(conn, &class_id)? else {
        return Err(HandlerErr::not_found("class"));
    };
    let snap = Snapshot::load(conn)?;

    let roster = metrics::class_roster(&snap.students, &class_id);
    let per_student: Vec<(&store::Student, metrics::StudentStats)> = roster
        .iter()
        .map(|s| (*s, metrics::student_stats(&snap, &s.id, &class_id)))
        .collect();
    let roster_rows = per_student
        .iter()
        .map(|(student, stats)| {
            json!({
                "student": student,
                "stats": stats,
                "riskTier": metrics::classify(stats),
            })
        })
        .collect::<Vec<_>>();
    let stats_only: Vec<metrics::StudentStats> =
        per_student.iter().map(|(_, stats)| *stats).collect();

    let attendance_records = snap
        .attendance
        .iter()
        .filter(|r| r.class_id == class_id)
        .count();
    let grades_entered = snap
        .grades
        .iter()
        .filter(|g| roster.iter().any(|s| s.id == g.student_id))
        .count();

    Ok(json!({
        "class": class,
        "stats": metrics::class_stats(&snap, &class_id),
        "summary": {
            "totalStudents": roster.len(),
            "attendanceRecords": attendance_records,
            "gradesEntered": grades_entered,
        },
        "roster": roster_rows,
        "gradeCohorts": metrics::grade_cohorts(&stats_only),
        "attendanceCohorts": metrics::attendance_cohorts(&stats_only),
        "recentAttendance": recent_attendance_rows(&snap, &class_id, RECENT_LIMIT),
        "recentGrades": recent_grade_rows(&snap, &class_id, RECENT_LIMIT),
    }))
}

fn handle_dashboard_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match dashboard_open(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_dashboard_class_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match dashboard_class_stats(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_dashboard_student_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match dashboard_student_stats(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_dashboard_cohorts(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match dashboard_cohorts(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(handle_dashboard_open(state, req)),
        "dashboard.classStats" => Some(handle_dashboard_class_stats(state, req)),
        "dashboard.studentStats" => Some(handle_dashboard_student_stats(state, req)),
        "dashboard.cohorts" => Some(handle_dashboard_cohorts(state, req)),
        _ => None,
    }
}
