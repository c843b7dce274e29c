use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Attendance statuses the write boundary accepts. Aggregation only cares
/// about "present"; everything else counts against the rate.
pub const ATTENDANCE_STATUSES: &[&str] = &["present", "absent", "late", "excused"];

#[derive(Debug)]
pub enum StoreError {
    NotFound { what: &'static str, id: String },
    Query(rusqlite::Error),
    Insert(rusqlite::Error),
    Update(rusqlite::Error),
    Delete(rusqlite::Error),
}

impl StoreError {
    pub fn not_found(what: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Query(_) => "db_query_failed",
            StoreError::Insert(_) => "db_insert_failed",
            StoreError::Update(_) => "db_update_failed",
            StoreError::Delete(_) => "db_delete_failed",
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { what, .. } => write!(f, "{} not found", what),
            StoreError::Query(e)
            | StoreError::Insert(e)
            | StoreError::Update(e)
            | StoreError::Delete(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub code: String,
    pub semester: String,
    pub year: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub email: String,
    pub student_no: String,
    pub photo: Option<String>,
    pub enrollment_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub date: String,
    pub status: String,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub student_id: String,
    pub assignment_id: String,
    pub score: f64,
    pub max_score: f64,
    pub submitted_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub due_date: Option<String>,
    pub total_points: f64,
}

/// Point-in-time copy of every collection. The metrics engine only ever
/// sees one of these, never a live connection.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub classes: Vec<Class>,
    pub students: Vec<Student>,
    pub attendance: Vec<AttendanceRecord>,
    pub grades: Vec<Grade>,
    pub assignments: Vec<Assignment>,
}

impl Snapshot {
    pub fn load(conn: &Connection) -> Result<Self, StoreError> {
        Ok(Snapshot {
            classes: classes_all(conn)?,
            students: students_all(conn)?,
            attendance: attendance_all(conn)?,
            grades: grades_all(conn)?,
            assignments: assignments_all(conn)?,
        })
    }
}

fn class_from_row(r: &Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        id: r.get(0)?,
        name: r.get(1)?,
        code: r.get(2)?,
        semester: r.get(3)?,
        year: r.get(4)?,
    })
}

fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        class_id: r.get(1)?,
        name: r.get(2)?,
        email: r.get(3)?,
        student_no: r.get(4)?,
        photo: r.get(5)?,
        enrollment_date: r.get(6)?,
    })
}

fn attendance_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: r.get(0)?,
        student_id: r.get(1)?,
        class_id: r.get(2)?,
        date: r.get(3)?,
        status: r.get(4)?,
        notes: r.get(5)?,
    })
}

fn grade_from_row(r: &Row<'_>) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: r.get(0)?,
        student_id: r.get(1)?,
        assignment_id: r.get(2)?,
        score: r.get(3)?,
        max_score: r.get(4)?,
        submitted_date: r.get(5)?,
    })
}

fn assignment_from_row(r: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: r.get(0)?,
        class_id: r.get(1)?,
        name: r.get(2)?,
        category: r.get(3)?,
        weight: r.get(4)?,
        due_date: r.get(5)?,
        total_points: r.get(6)?,
    })
}

const CLASS_COLS: &str = "id, name, code, semester, year";
const STUDENT_COLS: &str = "id, class_id, name, email, student_no, photo, enrollment_date";
const ATTENDANCE_COLS: &str = "id, student_id, class_id, date, status, notes";
const GRADE_COLS: &str = "id, student_id, assignment_id, score, max_score, submitted_date";
const ASSIGNMENT_COLS: &str = "id, class_id, name, category, weight, due_date, total_points";

// ---- classes ----

pub fn classes_all(conn: &Connection) -> Result<Vec<Class>, StoreError> {
    let sql = format!("SELECT {} FROM classes ORDER BY name", CLASS_COLS);
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([], class_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn class_by_id(conn: &Connection, id: &str) -> Result<Option<Class>, StoreError> {
    let sql = format!("SELECT {} FROM classes WHERE id = ?", CLASS_COLS);
    conn.query_row(&sql, [id], class_from_row)
        .optional()
        .map_err(StoreError::Query)
}

pub fn class_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    conn.query_row("SELECT 1 FROM classes WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(StoreError::Query)
}

/// classes.list wants a per-class roster size without a second round trip.
pub fn classes_with_student_counts(conn: &Connection) -> Result<Vec<(Class, i64)>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT
               c.id, c.name, c.code, c.semester, c.year,
               (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count
             FROM classes c
             ORDER BY c.name",
        )
        .map_err(StoreError::Query)?;
    stmt.query_map([], |r| Ok((class_from_row(r)?, r.get::<_, i64>(5)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub struct NewClass {
    pub name: String,
    pub code: String,
    pub semester: String,
    pub year: i64,
}

pub fn create_class(conn: &Connection, fields: NewClass) -> Result<Class, StoreError> {
    let record = Class {
        id: Uuid::new_v4().to_string(),
        name: fields.name,
        code: fields.code,
        semester: fields.semester,
        year: fields.year,
    };
    conn.execute(
        "INSERT INTO classes(id, name, code, semester, year) VALUES(?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.name,
            &record.code,
            &record.semester,
            record.year,
        ),
    )
    .map_err(StoreError::Insert)?;
    Ok(record)
}

#[derive(Debug, Default)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i64>,
}

pub fn update_class(conn: &Connection, id: &str, patch: ClassPatch) -> Result<Class, StoreError> {
    let Some(mut record) = class_by_id(conn, id)? else {
        return Err(StoreError::not_found("class", id));
    };
    if let Some(v) = patch.name {
        record.name = v;
    }
    if let Some(v) = patch.code {
        record.code = v;
    }
    if let Some(v) = patch.semester {
        record.semester = v;
    }
    if let Some(v) = patch.year {
        record.year = v;
    }
    conn.execute(
        "UPDATE classes SET name = ?, code = ?, semester = ?, year = ? WHERE id = ?",
        (
            &record.name,
            &record.code,
            &record.semester,
            record.year,
            id,
        ),
    )
    .map_err(StoreError::Update)?;
    Ok(record)
}

/// Non-cascading by contract: students/attendance/grades keep their rows
/// and dangle until readers filter or sentinel them out.
pub fn delete_class(conn: &Connection, id: &str) -> Result<Class, StoreError> {
    let Some(record) = class_by_id(conn, id)? else {
        return Err(StoreError::not_found("class", id));
    };
    conn.execute("DELETE FROM classes WHERE id = ?", [id])
        .map_err(StoreError::Delete)?;
    Ok(record)
}

// ---- students ----

pub fn students_all(conn: &Connection) -> Result<Vec<Student>, StoreError> {
    let sql = format!("SELECT {} FROM students ORDER BY name", STUDENT_COLS);
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([], student_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn students_for_class(conn: &Connection, class_id: &str) -> Result<Vec<Student>, StoreError> {
    let sql = format!(
        "SELECT {} FROM students WHERE class_id = ? ORDER BY name",
        STUDENT_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([class_id], student_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn student_by_id(conn: &Connection, id: &str) -> Result<Option<Student>, StoreError> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLS);
    conn.query_row(&sql, [id], student_from_row)
        .optional()
        .map_err(StoreError::Query)
}

pub fn student_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    conn.query_row("SELECT 1 FROM students WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(StoreError::Query)
}

pub struct NewStudent {
    pub class_id: String,
    pub name: String,
    pub email: String,
    pub student_no: String,
    pub photo: Option<String>,
    pub enrollment_date: String,
}

pub fn create_student(conn: &Connection, fields: NewStudent) -> Result<Student, StoreError> {
    let record = Student {
        id: Uuid::new_v4().to_string(),
        class_id: fields.class_id,
        name: fields.name,
        email: fields.email,
        student_no: fields.student_no,
        photo: fields.photo,
        enrollment_date: fields.enrollment_date,
    };
    conn.execute(
        "INSERT INTO students(id, class_id, name, email, student_no, photo, enrollment_date)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.class_id,
            &record.name,
            &record.email,
            &record.student_no,
            record.photo.as_deref(),
            &record.enrollment_date,
        ),
    )
    .map_err(StoreError::Insert)?;
    Ok(record)
}

#[derive(Debug, Default)]
pub struct StudentPatch {
    pub class_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub student_no: Option<String>,
    pub photo: Option<Option<String>>,
    pub enrollment_date: Option<String>,
}

pub fn update_student(
    conn: &Connection,
    id: &str,
    patch: StudentPatch,
) -> Result<Student, StoreError> {
    let Some(mut record) = student_by_id(conn, id)? else {
        return Err(StoreError::not_found("student", id));
    };
    if let Some(v) = patch.class_id {
        record.class_id = v;
    }
    if let Some(v) = patch.name {
        record.name = v;
    }
    if let Some(v) = patch.email {
        record.email = v;
    }
    if let Some(v) = patch.student_no {
        record.student_no = v;
    }
    if let Some(v) = patch.photo {
        record.photo = v;
    }
    if let Some(v) = patch.enrollment_date {
        record.enrollment_date = v;
    }
    conn.execute(
        "UPDATE students
         SET class_id = ?, name = ?, email = ?, student_no = ?, photo = ?, enrollment_date = ?
         WHERE id = ?",
        (
            &record.class_id,
            &record.name,
            &record.email,
            &record.student_no,
            record.photo.as_deref(),
            &record.enrollment_date,
            id,
        ),
    )
    .map_err(StoreError::Update)?;
    Ok(record)
}

pub fn delete_student(conn: &Connection, id: &str) -> Result<Student, StoreError> {
    let Some(record) = student_by_id(conn, id)? else {
        return Err(StoreError::not_found("student", id));
    };
    conn.execute("DELETE FROM students WHERE id = ?", [id])
        .map_err(StoreError::Delete)?;
    Ok(record)
}

// ---- attendance ----

pub fn attendance_all(conn: &Connection) -> Result<Vec<AttendanceRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM attendance_records ORDER BY date, rowid",
        ATTENDANCE_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([], attendance_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn attendance_by_id(
    conn: &Connection,
    id: &str,
) -> Result<Option<AttendanceRecord>, StoreError> {
    let sql = format!("SELECT {} FROM attendance_records WHERE id = ?", ATTENDANCE_COLS);
    conn.query_row(&sql, [id], attendance_from_row)
        .optional()
        .map_err(StoreError::Query)
}

pub fn attendance_list(
    conn: &Connection,
    class_id: &str,
    student_id: Option<&str>,
    date: Option<&str>,
) -> Result<Vec<AttendanceRecord>, StoreError> {
    let mut sql = format!(
        "SELECT {} FROM attendance_records WHERE class_id = ?",
        ATTENDANCE_COLS
    );
    let mut binds: Vec<Value> = vec![Value::Text(class_id.to_string())];
    if let Some(sid) = student_id {
        sql.push_str(" AND student_id = ?");
        binds.push(Value::Text(sid.to_string()));
    }
    if let Some(d) = date {
        sql.push_str(" AND date = ?");
        binds.push(Value::Text(d.to_string()));
    }
    sql.push_str(" ORDER BY date, rowid");
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map(params_from_iter(binds), attendance_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

/// Newest class rows first, for the "Recent Attendance" feed.
pub fn attendance_recent(
    conn: &Connection,
    class_id: &str,
    limit: i64,
) -> Result<Vec<AttendanceRecord>, StoreError> {
    let sql = format!(
        "SELECT {} FROM attendance_records
         WHERE class_id = ?
         ORDER BY date DESC, rowid DESC
         LIMIT ?",
        ATTENDANCE_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map((class_id, limit), attendance_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub struct NewAttendanceRecord {
    pub student_id: String,
    pub class_id: String,
    pub date: String,
    pub status: String,
    pub notes: String,
}

pub fn create_attendance(
    conn: &Connection,
    fields: NewAttendanceRecord,
) -> Result<AttendanceRecord, StoreError> {
    let record = AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        student_id: fields.student_id,
        class_id: fields.class_id,
        date: fields.date,
        status: fields.status,
        notes: fields.notes,
    };
    conn.execute(
        "INSERT INTO attendance_records(id, student_id, class_id, date, status, notes)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.student_id,
            &record.class_id,
            &record.date,
            &record.status,
            &record.notes,
        ),
    )
    .map_err(StoreError::Insert)?;
    Ok(record)
}

#[derive(Debug, Default)]
pub struct AttendancePatch {
    pub date: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

pub fn update_attendance(
    conn: &Connection,
    id: &str,
    patch: AttendancePatch,
) -> Result<AttendanceRecord, StoreError> {
    let Some(mut record) = attendance_by_id(conn, id)? else {
        return Err(StoreError::not_found("attendance record", id));
    };
    if let Some(v) = patch.date {
        record.date = v;
    }
    if let Some(v) = patch.status {
        record.status = v;
    }
    if let Some(v) = patch.notes {
        record.notes = v;
    }
    conn.execute(
        "UPDATE attendance_records SET date = ?, status = ?, notes = ? WHERE id = ?",
        (&record.date, &record.status, &record.notes, id),
    )
    .map_err(StoreError::Update)?;
    Ok(record)
}

pub fn delete_attendance(conn: &Connection, id: &str) -> Result<AttendanceRecord, StoreError> {
    let Some(record) = attendance_by_id(conn, id)? else {
        return Err(StoreError::not_found("attendance record", id));
    };
    conn.execute("DELETE FROM attendance_records WHERE id = ?", [id])
        .map_err(StoreError::Delete)?;
    Ok(record)
}

// ---- grades ----

pub fn grades_all(conn: &Connection) -> Result<Vec<Grade>, StoreError> {
    let sql = format!(
        "SELECT {} FROM grades ORDER BY submitted_date, rowid",
        GRADE_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([], grade_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn grade_by_id(conn: &Connection, id: &str) -> Result<Option<Grade>, StoreError> {
    let sql = format!("SELECT {} FROM grades WHERE id = ?", GRADE_COLS);
    conn.query_row(&sql, [id], grade_from_row)
        .optional()
        .map_err(StoreError::Query)
}

pub fn grades_for_student(conn: &Connection, student_id: &str) -> Result<Vec<Grade>, StoreError> {
    let sql = format!(
        "SELECT {} FROM grades WHERE student_id = ? ORDER BY submitted_date, rowid",
        GRADE_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([student_id], grade_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

/// Class scope for grades means "grades of the class's students"; a grade
/// whose student row is gone has no class and is not returned here.
pub fn grades_for_class_students(
    conn: &Connection,
    class_id: &str,
) -> Result<Vec<Grade>, StoreError> {
    let sql = "SELECT g.id, g.student_id, g.assignment_id, g.score, g.max_score, g.submitted_date
         FROM grades g
         JOIN students s ON s.id = g.student_id
         WHERE s.class_id = ?
         ORDER BY g.submitted_date, g.rowid";
    let mut stmt = conn.prepare(sql).map_err(StoreError::Query)?;
    stmt.query_map([class_id], grade_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

/// Newest grades of the class's students first, for the "Recent Grades" feed.
pub fn grades_recent(
    conn: &Connection,
    class_id: &str,
    limit: i64,
) -> Result<Vec<Grade>, StoreError> {
    let sql = "SELECT g.id, g.student_id, g.assignment_id, g.score, g.max_score, g.submitted_date
         FROM grades g
         JOIN students s ON s.id = g.student_id
         WHERE s.class_id = ?
         ORDER BY g.submitted_date DESC, g.rowid DESC
         LIMIT ?";
    let mut stmt = conn.prepare(sql).map_err(StoreError::Query)?;
    stmt.query_map((class_id, limit), grade_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub struct NewGrade {
    pub student_id: String,
    pub assignment_id: String,
    pub score: f64,
    pub max_score: f64,
    pub submitted_date: String,
}

pub fn create_grade(conn: &Connection, fields: NewGrade) -> Result<Grade, StoreError> {
    let record = Grade {
        id: Uuid::new_v4().to_string(),
        student_id: fields.student_id,
        assignment_id: fields.assignment_id,
        score: fields.score,
        max_score: fields.max_score,
        submitted_date: fields.submitted_date,
    };
    conn.execute(
        "INSERT INTO grades(id, student_id, assignment_id, score, max_score, submitted_date)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.student_id,
            &record.assignment_id,
            record.score,
            record.max_score,
            &record.submitted_date,
        ),
    )
    .map_err(StoreError::Insert)?;
    Ok(record)
}

#[derive(Debug, Default)]
pub struct GradePatch {
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub submitted_date: Option<String>,
}

pub fn update_grade(conn: &Connection, id: &str, patch: GradePatch) -> Result<Grade, StoreError> {
    let Some(mut record) = grade_by_id(conn, id)? else {
        return Err(StoreError::not_found("grade", id));
    };
    if let Some(v) = patch.score {
        record.score = v;
    }
    if let Some(v) = patch.max_score {
        record.max_score = v;
    }
    if let Some(v) = patch.submitted_date {
        record.submitted_date = v;
    }
    conn.execute(
        "UPDATE grades SET score = ?, max_score = ?, submitted_date = ? WHERE id = ?",
        (record.score, record.max_score, &record.submitted_date, id),
    )
    .map_err(StoreError::Update)?;
    Ok(record)
}

pub fn delete_grade(conn: &Connection, id: &str) -> Result<Grade, StoreError> {
    let Some(record) = grade_by_id(conn, id)? else {
        return Err(StoreError::not_found("grade", id));
    };
    conn.execute("DELETE FROM grades WHERE id = ?", [id])
        .map_err(StoreError::Delete)?;
    Ok(record)
}

// ---- assignments ----

pub fn assignments_all(conn: &Connection) -> Result<Vec<Assignment>, StoreError> {
    let sql = format!("SELECT {} FROM assignments ORDER BY name", ASSIGNMENT_COLS);
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([], assignment_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn assignments_for_class(
    conn: &Connection,
    class_id: &str,
) -> Result<Vec<Assignment>, StoreError> {
    let sql = format!(
        "SELECT {} FROM assignments WHERE class_id = ? ORDER BY name",
        ASSIGNMENT_COLS
    );
    let mut stmt = conn.prepare(&sql).map_err(StoreError::Query)?;
    stmt.query_map([class_id], assignment_from_row)
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(StoreError::Query)
}

pub fn assignment_by_id(conn: &Connection, id: &str) -> Result<Option<Assignment>, StoreError> {
    let sql = format!("SELECT {} FROM assignments WHERE id = ?", ASSIGNMENT_COLS);
    conn.query_row(&sql, [id], assignment_from_row)
        .optional()
        .map_err(StoreError::Query)
}

pub fn assignment_exists(conn: &Connection, id: &str) -> Result<bool, StoreError> {
    conn.query_row("SELECT 1 FROM assignments WHERE id = ?", [id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
    .map_err(StoreError::Query)
}

pub struct NewAssignment {
    pub class_id: String,
    pub name: String,
    pub category: String,
    pub weight: f64,
    pub due_date: Option<String>,
    pub total_points: f64,
}

pub fn create_assignment(
    conn: &Connection,
    fields: NewAssignment,
) -> Result<Assignment, StoreError> {
    let record = Assignment {
        id: Uuid::new_v4().to_string(),
        class_id: fields.class_id,
        name: fields.name,
        category: fields.category,
        weight: fields.weight,
        due_date: fields.due_date,
        total_points: fields.total_points,
    };
    conn.execute(
        "INSERT INTO assignments(id, class_id, name, category, weight, due_date, total_points)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &record.id,
            &record.class_id,
            &record.name,
            &record.category,
            record.weight,
            record.due_date.as_deref(),
            record.total_points,
        ),
    )
    .map_err(StoreError::Insert)?;
    Ok(record)
}

#[derive(Debug, Default)]
pub struct AssignmentPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub weight: Option<f64>,
    pub due_date: Option<Option<String>>,
    pub total_points: Option<f64>,
}

pub fn update_assignment(
    conn: &Connection,
    id: &str,
    patch: AssignmentPatch,
) -> Result<Assignment, StoreError> {
    let Some(mut record) = assignment_by_id(conn, id)? else {
        return Err(StoreError::not_found("assignment", id));
    };
    if let Some(v) = patch.name {
        record.name = v;
    }
    if let Some(v) = patch.category {
        record.category = v;
    }
    if let Some(v) = patch.weight {
        record.weight = v;
    }
    if let Some(v) = patch.due_date {
        record.due_date = v;
    }
    if let Some(v) = patch.total_points {
        record.total_points = v;
    }
    conn.execute(
        "UPDATE assignments
         SET name = ?, category = ?, weight = ?, due_date = ?, total_points = ?
         WHERE id = ?",
        (
            &record.name,
            &record.category,
            record.weight,
            record.due_date.as_deref(),
            record.total_points,
            id,
        ),
    )
    .map_err(StoreError::Update)?;
    Ok(record)
}

pub fn delete_assignment(conn: &Connection, id: &str) -> Result<Assignment, StoreError> {
    let Some(record) = assignment_by_id(conn, id)? else {
        return Err(StoreError::not_found("assignment", id));
    };
    conn.execute("DELETE FROM assignments WHERE id = ?", [id])
        .map_err(StoreError::Delete)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::init_schema(&conn).expect("init schema");
        conn
    }

    fn seed_class(conn: &Connection) -> Class {
        create_class(
            conn,
            NewClass {
                name: "Biology 101".to_string(),
                code: "BIO101".to_string(),
                semester: "Fall".to_string(),
                year: 2025,
            },
        )
        .expect("create class")
    }

    fn seed_student(conn: &Connection, class_id: &str, name: &str) -> Student {
        create_student(
            conn,
            NewStudent {
                class_id: class_id.to_string(),
                name: name.to_string(),
                email: format!("{}@school.edu", name.to_ascii_lowercase().replace(' ', ".")),
                student_no: "S-001".to_string(),
                photo: None,
                enrollment_date: "2025-08-20T00:00:00Z".to_string(),
            },
        )
        .expect("create student")
    }

    #[test]
    fn create_assigns_fresh_ids_and_get_by_id_round_trips() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let a = seed_student(&conn, &class.id, "Ada Park");
        let b = seed_student(&conn, &class.id, "Ben Okafor");
        assert_ne!(a.id, b.id);

        let fetched = student_by_id(&conn, &a.id).expect("query").expect("present");
        assert_eq!(fetched.name, "Ada Park");
        assert_eq!(fetched.class_id, class.id);
        assert!(student_by_id(&conn, "missing").expect("query").is_none());
    }

    #[test]
    fn update_merges_patch_and_returns_merged_record() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let s = seed_student(&conn, &class.id, "Ada Park");

        let merged = update_student(
            &conn,
            &s.id,
            StudentPatch {
                email: Some("ada@school.edu".to_string()),
                photo: Some(Some("https://example.com/ada.jpg".to_string())),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(merged.name, "Ada Park");
        assert_eq!(merged.email, "ada@school.edu");
        assert_eq!(merged.photo.as_deref(), Some("https://example.com/ada.jpg"));

        let cleared = update_student(
            &conn,
            &s.id,
            StudentPatch {
                photo: Some(None),
                ..Default::default()
            },
        )
        .expect("update");
        assert_eq!(cleared.photo, None);
    }

    #[test]
    fn update_and_delete_report_not_found_for_missing_ids() {
        let conn = test_conn();
        let err = update_student(&conn, "nope", StudentPatch::default()).unwrap_err();
        assert_eq!(err.code(), "not_found");
        assert_eq!(err.to_string(), "student not found");

        let err = delete_grade(&conn, "nope").unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn delete_returns_the_removed_record() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let s = seed_student(&conn, &class.id, "Ada Park");
        let removed = delete_student(&conn, &s.id).expect("delete");
        assert_eq!(removed.id, s.id);
        assert!(student_by_id(&conn, &s.id).expect("query").is_none());
    }

    #[test]
    fn class_delete_leaves_students_dangling() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let s = seed_student(&conn, &class.id, "Ada Park");

        delete_class(&conn, &class.id).expect("delete class");
        // No cascade: the student row survives with a dangling class_id.
        let orphan = student_by_id(&conn, &s.id).expect("query").expect("present");
        assert_eq!(orphan.class_id, class.id);
        assert!(!class_exists(&conn, &class.id).expect("probe"));
    }

    #[test]
    fn grades_for_class_follow_student_membership_not_assignment() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let other = create_class(
            &conn,
            NewClass {
                name: "Chemistry 201".to_string(),
                code: "CHE201".to_string(),
                semester: "Fall".to_string(),
                year: 2025,
            },
        )
        .expect("create class");
        let s = seed_student(&conn, &class.id, "Ada Park");

        // Assignment belongs to the other class; the grade still counts for
        // Ada's class because grade scope follows the student.
        let foreign = create_assignment(
            &conn,
            NewAssignment {
                class_id: other.id.clone(),
                name: "Lab Report".to_string(),
                category: "Lab".to_string(),
                weight: 1.0,
                due_date: None,
                total_points: 20.0,
            },
        )
        .expect("create assignment");
        create_grade(
            &conn,
            NewGrade {
                student_id: s.id.clone(),
                assignment_id: foreign.id.clone(),
                score: 18.0,
                max_score: 20.0,
                submitted_date: "2025-09-01T00:00:00Z".to_string(),
            },
        )
        .expect("create grade");

        let for_class = grades_for_class_students(&conn, &class.id).expect("query");
        assert_eq!(for_class.len(), 1);
        let for_other = grades_for_class_students(&conn, &other.id).expect("query");
        assert!(for_other.is_empty());
    }

    #[test]
    fn attendance_list_filters_and_recent_orders_newest_first() {
        let conn = test_conn();
        let class = seed_class(&conn);
        let s = seed_student(&conn, &class.id, "Ada Park");
        for date in ["2025-09-01", "2025-09-03", "2025-09-02"] {
            create_attendance(
                &conn,
                NewAttendanceRecord {
                    student_id: s.id.clone(),
                    class_id: class.id.clone(),
                    date: date.to_string(),
                    status: "present".to_string(),
                    notes: String::new(),
                },
            )
            .expect("create attendance");
        }

        let all = attendance_list(&conn, &class.id, None, None).expect("list");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, "2025-09-01");

        let one_day =
            attendance_list(&conn, &class.id, Some(&s.id), Some("2025-09-02")).expect("list");
        assert_eq!(one_day.len(), 1);

        let recent = attendance_recent(&conn, &class.id, 2).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, "2025-09-03");
        assert_eq!(recent[1].date, "2025-09-02");
    }
}
