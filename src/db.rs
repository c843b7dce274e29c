use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("classhub.sqlite3");
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

// No PRAGMA foreign_keys here. Deletes are non-cascading by contract:
// removing a class strands its students/attendance/grades, and every
// reader must tolerate the dangling references.
pub(crate) fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            semester TEXT NOT NULL,
            year INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            student_no TEXT NOT NULL,
            photo TEXT,
            enrollment_date TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    // Existing workspaces may predate the photo column. Add it if needed.
    ensure_students_photo(conn)?;

    // No UNIQUE(student_id, date): duplicate rows per student per day are
    // legal and aggregation simply counts them.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_class ON attendance_records(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance_records(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_class_date ON attendance_records(class_id, date)",
        [],
    )?;
    ensure_attendance_notes(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            weight REAL NOT NULL,
            due_date TEXT,
            total_points REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_class ON assignments(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            assignment_id TEXT NOT NULL,
            score REAL NOT NULL,
            max_score REAL NOT NULL,
            submitted_date TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_assignment ON grades(assignment_id)",
        [],
    )?;

    Ok(())
}

fn ensure_students_photo(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "photo")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE students ADD COLUMN photo TEXT", [])?;
    Ok(())
}

fn ensure_attendance_notes(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance_records", "notes")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE attendance_records ADD COLUMN notes TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
