use anyhow::{bail, Context};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Every table the report reads. The store is owned by the host platform;
/// the report only ever issues SELECTs against it.
const REQUIRED_TABLES: &[&str] = &[
    "course",
    "user",
    "enrol",
    "user_enrolments",
    "groups",
    "groups_members",
    "modules",
    "course_modules",
    "assign",
    "assign_submission",
    "assign_grades",
    "assignfeedback_comments",
    "scale",
    "grade_items",
    "context",
    "grading_areas",
    "grading_definitions",
    "gradingform_btec_criteria",
    "grading_instances",
    "gradingform_btec_fillings",
];

/// Opens the gradebook snapshot read-only and verifies the schema up front,
/// so a misconfigured store fails at open time rather than mid-render.
pub fn open_gradebook(path: &Path) -> anyhow::Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open gradebook at {}", path.display()))?;

    let missing = missing_tables(&conn)?;
    if !missing.is_empty() {
        bail!("gradebook store is missing tables: {}", missing.join(", "));
    }
    Ok(conn)
}

fn missing_tables(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")?;
    let mut missing = Vec::new();
    for table in REQUIRED_TABLES {
        if !stmt.exists([*table])? {
            missing.push((*table).to_string());
        }
    }
    Ok(missing)
}
