use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

fn handle_staff_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name, registration_no, role, active
         FROM staff WHERE school_id = ? ORDER BY name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&school_id], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let registration_no: String = row.get(2)?;
            let role: Option<String> = row.get(3)?;
            let active: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "registrationNo": registration_no,
                "role": role,
                "active": active != 0
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(staff) => ok(&req.id, json!({ "staff": staff })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_staff_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    // Registration numbers disambiguate staff in the teacher picker; they
    // must be unique within a school.
    let registration_no = match req.params.get("registrationNo").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing registrationNo", None),
    };
    if registration_no.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "registrationNo must not be empty",
            None,
        );
    }
    let role = req
        .params
        .get("role")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM staff WHERE school_id = ? AND registration_no = ?",
            (&school_id, &registration_no),
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
            "a staff member with this registration number already exists",
            Some(json!({ "registrationNo": registration_no })),
        );
    }

    let staff_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO staff(id, school_id, name, registration_no, role, active)
         VALUES(?, ?, ?, ?, ?, 1)",
        (&staff_id, &school_id, &name, &registration_no, &role),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "staff" })),
        );
    }

    ok(
        &req.id,
        json!({ "staffId": staff_id, "name": name, "registrationNo": registration_no }),
    )
}

fn handle_staff_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };

    let current: Option<(String, Option<String>)> = match conn
        .query_row(
            "SELECT name, role FROM staff WHERE id = ?",
            [&staff_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((current_name, current_role)) = current else {
        return err(&req.id, "not_found", "staff member not found", None);
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
    let role = match req.params.get("role").and_then(|v| v.as_str()) {
        Some(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => current_role,
    };

    if let Err(e) = conn.execute(
        "UPDATE staff SET name = ?, role = ? WHERE id = ?",
        (&name, &role, &staff_id),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "staffId": staff_id, "name": name, "role": role }),
    )
}

fn handle_staff_set_active(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };
    let active = match req.params.get("active").and_then(|v| v.as_bool()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing active", None),
    };

    let updated = match conn.execute(
        "UPDATE staff SET active = ? WHERE id = ?",
        (active as i64, &staff_id),
    ) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
    };
    if updated == 0 {
        return err(&req.id, "not_found", "staff member not found", None);
    }

    ok(&req.id, json!({ "staffId": staff_id, "active": active }))
}

fn handle_staff_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };

    let referenced: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM timetable_periods WHERE staff_id = ? LIMIT 1",
            [&staff_id],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if referenced.is_some() {
        return err(
            &req.id,
            "conflict",
            "staff member is assigned in a timetable",
            Some(json!({ "staffId": staff_id })),
        );
    }

    let deleted = match conn.execute("DELETE FROM staff WHERE id = ?", [&staff_id]) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_delete_failed", e.to_string(), None),
    };
    if deleted == 0 {
        return err(&req.id, "not_found", "staff member not found", None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.list" => Some(handle_staff_list(state, req)),
        "staff.create" => Some(handle_staff_create(state, req)),
        "staff.update" => Some(handle_staff_update(state, req)),
        "staff.setActive" => Some(handle_staff_set_active(state, req)),
        "staff.delete" => Some(handle_staff_delete(state, req)),
        _ => None,
    }
}
