use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

#[derive(Clone, Copy)]
enum SchoolStatus {
    Active,
    Inactive,
    Blocked,
}

impl SchoolStatus {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Blocked => "blocked",
        }
    }
}

fn handle_schools_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    // Counts let the console dashboard render without follow-up requests.
    let mut stmt = match conn.prepare(
        "SELECT
           s.id,
           s.name,
           s.code,
           s.status,
           (SELECT COUNT(*) FROM classes c WHERE c.school_id = s.id) AS class_count,
           (SELECT COUNT(*) FROM staff st WHERE st.school_id = s.id) AS staff_count,
           (SELECT COUNT(*) FROM students sd WHERE sd.school_id = s.id) AS student_count
         FROM schools s
         ORDER BY s.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let code: Option<String> = row.get(2)?;
            let status: String = row.get(3)?;
            let class_count: i64 = row.get(4)?;
            let staff_count: i64 = row.get(5)?;
            let student_count: i64 = row.get(6)?;
            Ok(json!({
                "id": id,
                "name": name,
                "code": code,
                "status": status,
                "classCount": class_count,
                "staffCount": staff_count,
                "studentCount": student_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(schools) => ok(&req.id, json!({ "schools": schools })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_schools_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let code = req
        .params
        .get("code")
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let taken: Option<i64> = match conn
        .query_row("SELECT 1 FROM schools WHERE name = ?", [&name], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if taken.is_some() {
        return err(
            &req.id,
            "conflict",
            "a school with this name already exists",
            Some(json!({ "name": name })),
        );
    }

    let school_id = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().format("%Y-%m-%d").to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO schools(id, name, code, status, created_at) VALUES(?, ?, ?, 'active', ?)",
        (&school_id, &name, &code, &created_at),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "schools" })),
        );
    }

    ok(
        &req.id,
        json!({ "schoolId": school_id, "name": name, "status": "active" }),
    )
}

fn handle_schools_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };

    let current: Option<(String, Option<String>)> = match conn
        .query_row(
            "SELECT name, code FROM schools WHERE id = ?",
            [&school_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((current_name, current_code)) = current else {
        return err(&req.id, "not_found", "school not found", None);
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
    let code = match req.params.get("code").and_then(|v| v.as_str()) {
        Some(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => current_code,
    };

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM schools WHERE name = ? AND id != ?",
            (&name, &school_id),
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
            "a school with this name already exists",
            Some(json!({ "name": name })),
        );
    }

    if let Err(e) = conn.execute(
        "UPDATE schools SET name = ?, code = ? WHERE id = ?",
        (&name, &code, &school_id),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(
        &req.id,
        json!({ "schoolId": school_id, "name": name, "code": code }),
    )
}

fn handle_schools_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };
    let status = match req
        .params
        .get("status")
        .and_then(|v| v.as_str())
        .and_then(SchoolStatus::parse)
    {
        Some(s) => s,
        None => {
            return err(
                &req.id,
                "bad_params",
                "status must be one of: active, inactive, blocked",
                None,
            )
        }
    };

    let updated = match conn.execute(
        "UPDATE schools SET status = ? WHERE id = ?",
        (status.key(), &school_id),
    ) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_update_failed", e.to_string(), None),
    };
    if updated == 0 {
        return err(&req.id, "not_found", "school not found", None);
    }

    ok(
        &req.id,
        json!({ "schoolId": school_id, "status": status.key() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schools.list" => Some(handle_schools_list(state, req)),
        "schools.create" => Some(handle_schools_create(state, req)),
        "schools.update" => Some(handle_schools_update(state, req)),
        "schools.setStatus" => Some(handle_schools_set_status(state, req)),
        _ => None,
    }
}
