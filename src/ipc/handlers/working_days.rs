use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{day_name, validate_day_set};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

/// The day set is persisted as a JSON array of weekday numbers so the
/// editor can rehydrate group order exactly as entered.
pub fn decode_days(raw: &str) -> Option<Vec<u8>> {
    serde_json::from_str::<Vec<u8>>(raw).ok()
}

fn handle_working_days_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };

    let mut stmt = match conn.prepare(
        "SELECT id, group_name, days FROM working_day_groups
         WHERE school_id = ? ORDER BY group_name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&school_id], |row| {
            let id: String = row.get(0)?;
            let group_name: String = row.get(1)?;
            let days_raw: String = row.get(2)?;
            Ok((id, group_name, days_raw))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    let rows = match rows {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let groups: Vec<serde_json::Value> = rows
        .into_iter()
        .map(|(id, group_name, days_raw)| {
            let days = decode_days(&days_raw).unwrap_or_default();
            let names: Vec<&str> = days.iter().filter_map(|&d| day_name(d)).collect();
            json!({
                "id": id,
                "groupName": group_name,
                "days": days,
                "dayNames": names
            })
        })
        .collect();

    ok(&req.id, json!({ "groups": groups }))
}

fn handle_working_days_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };
    let group_name = match req.params.get("groupName").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing groupName", None),
    };
    if group_name.is_empty() {
        return err(&req.id, "bad_params", "groupName must not be empty", None);
    }

    let Some(days_arr) = req.params.get("days").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing days[]", None);
    };
    let mut days: Vec<u8> = Vec::with_capacity(days_arr.len());
    for v in days_arr {
        match v.as_i64() {
            Some(n) if (1..=7).contains(&n) => days.push(n as u8),
            Some(n) => {
                return err(
                    &req.id,
                    "bad_params",
                    format!("week day out of range: {}", n),
                    None,
                )
            }
            None => return err(&req.id, "bad_params", "days must be integers", None),
        }
    }
    if let Err(msg) = validate_day_set(&days) {
        return err(&req.id, "bad_params", msg, None);
    }

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM working_day_groups WHERE school_id = ? AND group_name = ?",
            (&school_id, &group_name),
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
            "a working-day group with this name already exists",
            Some(json!({ "groupName": group_name })),
        );
    }

    let days_raw = match serde_json::to_string(&days) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };
    let group_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO working_day_groups(id, school_id, group_name, days)
         VALUES(?, ?, ?, ?)",
        (&group_id, &school_id, &group_name, &days_raw),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "working_day_groups" })),
        );
    }

    ok(
        &req.id,
        json!({ "groupId": group_id, "groupName": group_name, "days": days }),
    )
}

fn handle_working_days_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing groupId", None),
    };

    let referenced: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM timetables WHERE group_id = ? LIMIT 1",
            [&group_id],
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
            "working-day group is used by a timetable",
            Some(json!({ "groupId": group_id })),
        );
    }

    let deleted = match conn.execute("DELETE FROM working_day_groups WHERE id = ?", [&group_id]) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_delete_failed", e.to_string(), None),
    };
    if deleted == 0 {
        return err(&req.id, "not_found", "working-day group not found", None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "workingDays.list" => Some(handle_working_days_list(state, req)),
        "workingDays.create" => Some(handle_working_days_create(state, req)),
        "workingDays.delete" => Some(handle_working_days_delete(state, req)),
        _ => None,
    }
}
