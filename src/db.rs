use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "schooldesk.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schools(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            code TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT
        )",
        [],
    )?;
    // Workspaces created before the lifecycle screens may lack status/code.
    ensure_schools_lifecycle_columns(&conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS taxonomy_terms(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, kind, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_taxonomy_terms_school_kind
         ON taxonomy_terms(school_id, kind, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            name TEXT NOT NULL,
            code TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_school ON subjects(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            name TEXT NOT NULL,
            registration_no TEXT NOT NULL,
            role TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, registration_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_staff_school ON staff(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_school ON classes(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            class_id TEXT,
            name TEXT NOT NULL,
            admission_no TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(school_id, admission_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_school ON students(school_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS guardians(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            name TEXT NOT NULL,
            relation TEXT NOT NULL,
            phone TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_guardians_student ON guardians(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS working_day_groups(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            group_name TEXT NOT NULL,
            days TEXT NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, group_name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_working_day_groups_school
         ON working_day_groups(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetables(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            class_id TEXT NOT NULL UNIQUE,
            group_id TEXT NOT NULL,
            total_periods INTEGER NOT NULL,
            active_from TEXT NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(group_id) REFERENCES working_day_groups(id)
        )",
        [],
    )?;
    ensure_timetables_updated_at(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetables_school ON timetables(school_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS timetable_periods(
            timetable_id TEXT NOT NULL,
            week_day INTEGER NOT NULL,
            period_index INTEGER NOT NULL,
            subject_id TEXT NOT NULL,
            staff_id TEXT NOT NULL,
            PRIMARY KEY(timetable_id, week_day, period_index),
            FOREIGN KEY(timetable_id) REFERENCES timetables(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(staff_id) REFERENCES staff(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_periods_subject
         ON timetable_periods(subject_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_timetable_periods_staff
         ON timetable_periods(staff_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_boundaries(
            id TEXT PRIMARY KEY,
            school_id TEXT NOT NULL,
            grade TEXT NOT NULL,
            min_percent REAL NOT NULL,
            max_percent REAL NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(school_id) REFERENCES schools(id),
            UNIQUE(school_id, grade)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_boundaries_school
         ON grade_boundaries(school_id)",
        [],
    )?;

    Ok(conn)
}

fn ensure_schools_lifecycle_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "schools", "status")? {
        conn.execute(
            "ALTER TABLE schools ADD COLUMN status TEXT NOT NULL DEFAULT 'active'",
            [],
        )?;
    }
    if !table_has_column(conn, "schools", "code")? {
        conn.execute("ALTER TABLE schools ADD COLUMN code TEXT", [])?;
    }
    Ok(())
}

fn ensure_timetables_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "timetables", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE timetables ADD COLUMN updated_at TEXT", [])?;
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
