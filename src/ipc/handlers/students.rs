use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };
    let class_id = req
        .params
        .get("classId")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    // One statement per filter keeps the bindings simple.
    let result = if let Some(class_id) = &class_id {
        conn.prepare(
            "SELECT id, class_id, name, admission_no, active
             FROM students WHERE school_id = ? AND class_id = ? ORDER BY name",
        )
        .and_then(|mut stmt| {
            stmt.query_map((&school_id, class_id), student_row)
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        })
    } else {
        conn.prepare(
            "SELECT id, class_id, name, admission_no, active
             FROM students WHERE school_id = ? ORDER BY name",
        )
        .and_then(|mut stmt| {
            stmt.query_map([&school_id], student_row)
                .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        })
    };

    match result {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn student_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<serde_json::Value> {
    let id: String = row.get(0)?;
    let class_id: Option<String> = row.get(1)?;
    let name: String = row.get(2)?;
    let admission_no: String = row.get(3)?;
    let active: i64 = row.get(4)?;
    Ok(json!({
        "id": id,
        "classId": class_id,
        "name": name,
        "admissionNo": admission_no,
        "active": active != 0
    }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let admission_no = match req.params.get("admissionNo").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing admissionNo", None),
    };
    if admission_no.is_empty() {
        return err(&req.id, "bad_params", "admissionNo must not be empty", None);
    }
    let class_id = req
        .params
        .get("classId")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());

    if let Some(class_id) = &class_id {
        let exists: Option<i64> = match conn
            .query_row(
                "SELECT 1 FROM classes WHERE id = ? AND school_id = ?",
                (class_id, &school_id),
                |r| r.get(0),
            )
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if exists.is_none() {
            return err(&req.id, "not_found", "class not found", None);
        }
    }

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM students WHERE school_id = ? AND admission_no = ?",
            (&school_id, &admission_no),
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if taken.is_some() {
        return err(
            &req.id,
            "conflict",
            "a student with this admission number already exists",
            Some(json!({ "admissionNo": admission_no })),
        );
    }

    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(id, school_id, class_id, name, admission_no, active)
         VALUES(?, ?, ?, ?, ?, 1)",
        (&student_id, &school_id, &class_id, &name, &admission_no),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(
        &req.id,
        json!({ "studentId": student_id, "name": name, "admissionNo": admission_no }),
    )
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let current: Option<(String, Option<String>)> = match conn
        .query_row(
            "SELECT name, class_id FROM students WHERE id = ?",
            [&student_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((current_name, current_class)) = current else {
        return err(&req.id, "not_found", "student not found", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                return err(&req.id, "bad_params", "name must not be empty", None);
            }
            trimmed.to_string()
        }
        None => current_name,
    };
    // classId: null detaches, absent keeps the current link.
    let class_id = match req.params.get("classId") {
        Some(serde_json::Value::Null) => None,
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_string()),
            None => return err(&req.id, "bad_params", "classId must be a string", None),
        },
        None => current_class,
    };

    if let Some(class_id) = &class_id {
        let exists: Option<i64> = match conn
            .query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
                r.get(0)
            })
            .optional()
        {
            Ok(v) => v,
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if exists.is_none() {
            return err(&req.id, "not_found", "class not found", None);
        }
    }

    if let Err(e) = conn.execute(
        "UPDATE students SET name = ?, class_id = ? WHERE id = ?",
        (&name, &class_id, &student_id),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "studentId": student_id, "name": name, "classId": class_id }),
    )
}

fn handle_students_set_active(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let active = match req.params.get("active").and_then(|v| v.as_bool()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing active", None),
    };

    let updated = match conn.execute(
        "UPDATE students SET active = ? WHERE id = ?",
        (active as i64, &student_id),
    ) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
    };
    if updated == 0 {
        return err(&req.id, "not_found", "student not found", None);
    }

    ok(&req.id, json!({ "studentId": student_id, "active": active }))
}

fn handle_guardians_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name, relation, phone FROM guardians WHERE student_id = ? ORDER BY name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&student_id], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let relation: String = row.get(2)?;
            let phone: Option<String> = row.get(3)?;
            Ok(json!({ "id": id, "name": name, "relation": relation, "phone": phone }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(guardians) => ok(&req.id, json!({ "guardians": guardians })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_guardians_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let relation = match req.params.get("relation").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing relation", None),
    };
    if relation.is_empty() {
        return err(&req.id, "bad_params", "relation must not be empty", None);
    }
    let phone = req
        .params
        .get("phone")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [&student_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if exists.is_none() {
        return err(&req.id, "not_found", "student not found", None);
    }

    let guardian_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO guardians(id, student_id, name, relation, phone)
         VALUES(?, ?, ?, ?, ?)",
        (&guardian_id, &student_id, &name, &relation, &phone),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "guardians" })),
        );
    }

    ok(&req.id, json!({ "guardianId": guardian_id, "name": name }))
}

fn handle_guardians_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let guardian_id = match req.params.get("guardianId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing guardianId", None),
    };

    let deleted = match conn.execute("DELETE FROM guardians WHERE id = ?", [&guardian_id]) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_delete_failed", e.to_string(), None),
    };
    if deleted == 0 {
        return err(&req.id, "not_found", "guardian not found", None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.setActive" => Some(handle_students_set_active(state, req)),
        "guardians.list" => Some(handle_guardians_list(state, req)),
        "guardians.add" => Some(handle_guardians_add(state, req)),
        "guardians.remove" => Some(handle_guardians_remove(state, req)),
        _ => None,
    }
}
