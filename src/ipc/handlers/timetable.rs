use crate::ipc::error::{err, ok};
use crate::ipc::handlers::working_days::decode_days;
use crate::ipc::types::{AppState, Request};
use crate::timetable::{
    day_name, filter_staff, filter_subjects, slot_label, EditorError, EditorSession,
    PeriodAssignment, StaffRef, SubjectRef, TimetableDay, TimetableGrid, WorkingDayGroup,
};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn db(e: impl ToString) -> Self {
        HandlerErr {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        }
    }

    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn editor_error(id: &str, e: EditorError) -> serde_json::Value {
    match e {
        EditorError::NoClassSelected
        | EditorError::UnknownGroup
        | EditorError::BadPeriodCount => err(id, "bad_params", e.to_string(), None),
        EditorError::CellOutOfGrid {
            week_day,
            period_index,
        } => err(
            id,
            "bad_params",
            e.to_string(),
            Some(json!({ "weekDay": week_day, "periodIndex": period_index })),
        ),
        EditorError::NotGenerated | EditorError::NoOpenCell => {
            err(id, "editor_state", e.to_string(), None)
        }
        EditorError::FieldErrors { subject, staff } => err(
            id,
            "validation_failed",
            "subject and teacher are required",
            Some(json!({ "fieldErrors": { "subject": subject, "staff": staff } })),
        ),
        EditorError::Incomplete(report) => err(
            id,
            "validation_failed",
            "the timetable still has empty periods",
            Some(json!({ "emptyByDay": report.empty_by_day })),
        ),
    }
}

fn load_groups(conn: &Connection, school_id: &str) -> Result<Vec<WorkingDayGroup>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, group_name, days FROM working_day_groups
             WHERE school_id = ? ORDER BY group_name",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([school_id], |row| {
            let id: String = row.get(0)?;
            let group_name: String = row.get(1)?;
            let days_raw: String = row.get(2)?;
            Ok((id, group_name, days_raw))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(rows
        .into_iter()
        .map(|(id, group_name, days_raw)| WorkingDayGroup {
            id,
            group_name,
            days: decode_days(&days_raw).unwrap_or_default(),
        })
        .collect())
}

fn load_subjects(conn: &Connection, school_id: &str) -> Result<Vec<SubjectRef>, HandlerErr> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM subjects WHERE school_id = ? ORDER BY name")
        .map_err(HandlerErr::db)?;
    stmt.query_map([school_id], |row| {
        Ok(SubjectRef {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

fn load_staff(conn: &Connection, school_id: &str) -> Result<Vec<StaffRef>, HandlerErr> {
    // Only active staff are offered in the teacher picker.
    let mut stmt = conn
        .prepare(
            "SELECT id, name, registration_no FROM staff
             WHERE school_id = ? AND active = 1 ORDER BY name",
        )
        .map_err(HandlerErr::db)?;
    stmt.query_map([school_id], |row| {
        Ok(StaffRef {
            id: row.get(0)?,
            name: row.get(1)?,
            registration_no: row.get(2)?,
        })
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(HandlerErr::db)
}

struct StoredTimetable {
    id: String,
    group_id: String,
    total_periods: i64,
    active_from: String,
    days: Vec<TimetableDay>,
}

fn load_timetable(conn: &Connection, class_id: &str) -> Result<Option<StoredTimetable>, HandlerErr> {
    let head: Option<(String, String, i64, String)> = conn
        .query_row(
            "SELECT id, group_id, total_periods, active_from FROM timetables WHERE class_id = ?",
            [class_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(HandlerErr::db)?;
    let Some((id, group_id, total_periods, active_from)) = head else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare(
            "SELECT week_day, period_index, subject_id, staff_id
             FROM timetable_periods WHERE timetable_id = ?
             ORDER BY week_day, period_index",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([&id], |row| {
            let week_day: i64 = row.get(0)?;
            let period_index: i64 = row.get(1)?;
            let subject_id: String = row.get(2)?;
            let staff_id: String = row.get(3)?;
            Ok((week_day, period_index, subject_id, staff_id))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    let mut days: Vec<TimetableDay> = Vec::new();
    for (week_day, period_index, subject_id, staff_id) in rows {
        let assignment = PeriodAssignment {
            period_index: period_index.max(0) as usize,
            subject_id,
            staff_id,
        };
        match days.iter_mut().find(|d| d.week_day as i64 == week_day) {
            Some(day) => day.periods.push(assignment),
            None => days.push(TimetableDay {
                week_day: week_day.clamp(0, 255) as u8,
                periods: vec![assignment],
            }),
        }
    }

    Ok(Some(StoredTimetable {
        id,
        group_id,
        total_periods,
        active_from,
        days,
    }))
}

fn timetable_days_json(days: &[TimetableDay]) -> serde_json::Value {
    serde_json::to_value(days).unwrap_or_else(|_| json!([]))
}

/// Grid snapshot for the console: per day, the slot list with resolved
/// names so filled cells can render their Subject/Teacher label directly.
fn grid_view(session: &EditorSession, grid: &TimetableGrid) -> serde_json::Value {
    let days: Vec<serde_json::Value> = grid
        .days()
        .iter()
        .map(|col| {
            let slots: Vec<serde_json::Value> = col
                .slots
                .iter()
                .map(|slot| match slot {
                    None => serde_json::Value::Null,
                    Some(a) => {
                        let subject_name = session
                            .subject(&a.subject_id)
                            .map(|s| s.name.clone())
                            .unwrap_or_default();
                        let staff_name = session
                            .staff_member(&a.staff_id)
                            .map(|s| s.name.clone())
                            .unwrap_or_default();
                        json!({
                            "subjectId": a.subject_id,
                            "staffId": a.staff_id,
                            "label": slot_label(&subject_name, &staff_name)
                        })
                    }
                })
                .collect();
            json!({
                "weekDay": col.week_day,
                "dayName": day_name(col.week_day),
                "slots": slots
            })
        })
        .collect();
    json!({ "totalPeriods": grid.total_periods(), "days": days })
}

fn parse_week_day(req: &Request) -> Result<u8, serde_json::Value> {
    match req.params.get("weekDay").and_then(|v| v.as_i64()) {
        Some(v) if (1..=7).contains(&v) => Ok(v as u8),
        _ => Err(err(&req.id, "bad_params", "missing/invalid weekDay", None)),
    }
}

fn parse_period_index(req: &Request) -> Result<usize, serde_json::Value> {
    match req.params.get("periodIndex").and_then(|v| v.as_i64()) {
        Some(v) if v >= 1 => Ok(v as usize),
        _ => Err(err(
            &req.id,
            "bad_params",
            "missing/invalid periodIndex",
            None,
        )),
    }
}

fn handle_editor_open(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let school_exists: Option<i64> = match conn
        .query_row("SELECT 1 FROM schools WHERE id = ?", [&school_id], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if school_exists.is_none() {
        return err(&req.id, "not_found", "school not found", None);
    }

    let groups = match load_groups(conn, &school_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let subjects = match load_subjects(conn, &school_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let staff = match load_staff(conn, &school_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut class_stmt = match conn
        .prepare("SELECT id, name FROM classes WHERE school_id = ? ORDER BY name")
    {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let classes = match class_stmt
        .query_map([&school_id], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    // Editing an existing timetable starts from the stored copy.
    let existing = match &class_id {
        Some(class_id) => match load_timetable(conn, class_id) {
            Ok(v) => v,
            Err(e) => return e.response(&req.id),
        },
        None => None,
    };

    let mut session = EditorSession::new(school_id, groups, subjects, staff);
    session.class_id = class_id;
    session.timetable_id = existing.as_ref().map(|t| t.id.clone());

    let existing_json = existing.as_ref().map(|t| {
        json!({
            "timetableId": t.id,
            "groupId": t.group_id,
            "totalPeriods": t.total_periods,
            "activeFrom": t.active_from,
            "timetableDays": timetable_days_json(&t.days)
        })
    });

    let result = json!({
        "groups": &session.groups,
        "subjects": &session.subjects,
        "staff": &session.staff,
        "classes": classes,
        "existing": existing_json
    });
    state.editor = Some(session);
    ok(&req.id, result)
}

fn handle_editor_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return editor_error(&req.id, EditorError::NoClassSelected),
    };
    let group_id = match req.params.get("groupId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return editor_error(&req.id, EditorError::UnknownGroup),
    };
    let total_periods = match req.params.get("totalPeriods").and_then(|v| v.as_i64()) {
        Some(v) => v,
        None => return editor_error(&req.id, EditorError::BadPeriodCount),
    };

    let Some(session) = state.editor.as_mut() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };

    let class_ok: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM classes WHERE id = ? AND school_id = ?",
            (&class_id, &session.school_id),
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if class_ok.is_none() {
        return err(&req.id, "not_found", "class not found", None);
    }

    let stored = match load_timetable(conn, &class_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    if let Err(e) = session.generate(&class_id, &group_id, total_periods) {
        return editor_error(&req.id, e);
    }
    session.timetable_id = stored.as_ref().map(|t| t.id.clone());

    // Regenerating over the stored shape re-seeds the saved assignments;
    // any other shape starts empty (prior edits are intentionally lost).
    if let Some(stored) = &stored {
        if stored.group_id == group_id && stored.total_periods == total_periods {
            if let Err(e) = session.seed_from(&stored.days) {
                return editor_error(&req.id, e);
            }
        }
    }

    let view = match session.grid() {
        Some(grid) => grid_view(session, grid),
        None => return editor_error(&req.id, EditorError::NotGenerated),
    };
    ok(
        &req.id,
        json!({
            "editMode": session.timetable_id.is_some(),
            "grid": view
        }),
    )
}

fn handle_editor_open_cell(state: &mut AppState, req: &Request) -> serde_json::Value {
    let week_day = match parse_week_day(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let period_index = match parse_period_index(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(session) = state.editor.as_mut() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };

    let current = match session.open_cell(week_day, period_index) {
        Ok(v) => v,
        Err(e) => return editor_error(&req.id, e),
    };

    let seed = current.map(|a| {
        let subject = session.subject(&a.subject_id);
        let staff = session.staff_member(&a.staff_id);
        json!({
            "subjectId": a.subject_id,
            "subjectName": subject.map(|s| s.name.clone()),
            "staffId": a.staff_id,
            "staffName": staff.map(|s| s.name.clone()),
        })
    });

    ok(
        &req.id,
        json!({
            "weekDay": week_day,
            "dayName": day_name(week_day),
            "periodIndex": period_index,
            "current": seed
        }),
    )
}

fn handle_editor_search_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let Some(session) = state.editor.as_ref() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };
    let hits: Vec<&SubjectRef> = filter_subjects(&session.subjects, query);
    ok(&req.id, json!({ "subjects": hits }))
}

fn handle_editor_search_staff(state: &mut AppState, req: &Request) -> serde_json::Value {
    let query = req
        .params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let Some(session) = state.editor.as_ref() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };
    let hits: Vec<&StaffRef> = filter_staff(&session.staff, query);
    ok(&req.id, json!({ "staff": hits }))
}

fn handle_editor_save_cell(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject_id = req
        .params
        .get("subjectId")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let staff_id = req
        .params
        .get("staffId")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let Some(session) = state.editor.as_mut() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };

    let cell = match session.save_cell(subject_id, staff_id) {
        Ok(v) => v,
        Err(e) => return editor_error(&req.id, e),
    };

    let subject_name = session
        .subject(subject_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    let staff_name = session
        .staff_member(staff_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    ok(
        &req.id,
        json!({
            "weekDay": cell.week_day,
            "periodIndex": cell.period_index,
            "label": slot_label(&subject_name, &staff_name)
        }),
    )
}

fn handle_editor_cancel_cell(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.editor.as_mut() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };
    match session.cancel_cell() {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => editor_error(&req.id, e),
    }
}

fn handle_editor_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(session) = state.editor.as_ref() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };
    match session.validate() {
        Ok(report) => ok(
            &req.id,
            json!({
                "complete": report.complete,
                "emptyByDay": report.empty_by_day
            }),
        ),
        Err(e) => editor_error(&req.id, e),
    }
}

fn handle_editor_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let active_from = match req.params.get("activeFrom").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing activeFrom", None),
    };
    if NaiveDate::parse_from_str(&active_from, "%Y-%m-%d").is_err() {
        return err(
            &req.id,
            "bad_params",
            "activeFrom must be YYYY-MM-DD",
            Some(json!({ "activeFrom": active_from })),
        );
    }

    let Some(session) = state.editor.as_ref() else {
        return err(&req.id, "editor_state", "open the editor first", None);
    };

    let days = match session.submission() {
        Ok(v) => v,
        Err(e) => return editor_error(&req.id, e),
    };
    let Some(class_id) = session.class_id.clone() else {
        return editor_error(&req.id, EditorError::NoClassSelected);
    };
    let Some(group) = session.group() else {
        return editor_error(&req.id, EditorError::NotGenerated);
    };
    let group_id = group.id.clone();
    let total_periods = session
        .grid()
        .map(|g| g.total_periods() as i64)
        .unwrap_or(0);
    let school_id = session.school_id.clone();
    let timetable_id = session.timetable_id.clone();

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let timetable_id = match timetable_id {
        // Edit flow: the stored row is updated in place, periods replaced.
        Some(existing_id) => {
            if let Err(e) = tx.execute(
                "UPDATE timetables
                 SET group_id = ?, total_periods = ?, active_from = ?, updated_at = ?
                 WHERE id = ?",
                (&group_id, total_periods, &active_from, &now, &existing_id),
            ) {
                let _ = tx.rollback();
                return err(&req.id, "db_update_failed", e.to_string(), None);
            }
            if let Err(e) = tx.execute(
                "DELETE FROM timetable_periods WHERE timetable_id = ?",
                [&existing_id],
            ) {
                let _ = tx.rollback();
                return err(&req.id, "db_delete_failed", e.to_string(), None);
            }
            existing_id
        }
        None => {
            let occupied: Option<String> = match tx
                .query_row(
                    "SELECT id FROM timetables WHERE class_id = ?",
                    [&class_id],
                    |r| r.get(0),
                )
                .optional()
            {
                Ok(v) => v,
                Err(e) => {
                    let _ = tx.rollback();
                    return err(&req.id, "db_query_failed", e.to_string(), None);
                }
            };
            if occupied.is_some() {
                let _ = tx.rollback();
                return err(
                    &req.id,
                    "conflict",
                    "class already has a timetable; reopen the editor to edit it",
                    Some(json!({ "classId": class_id })),
                );
            }

            let new_id = Uuid::new_v4().to_string();
            if let Err(e) = tx.execute(
                "INSERT INTO timetables(id, school_id, class_id, group_id, total_periods, active_from, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?)",
                (
                    &new_id,
                    &school_id,
                    &class_id,
                    &group_id,
                    total_periods,
                    &active_from,
                    &now,
                ),
            ) {
                let _ = tx.rollback();
                return err(
                    &req.id,
                    "db_insert_failed",
                    e.to_string(),
                    Some(json!({ "table": "timetables" })),
                );
            }
            new_id
        }
    };

    let mut period_count: usize = 0;
    for day in &days {
        for p in &day.periods {
            if let Err(e) = tx.execute(
                "INSERT INTO timetable_periods(timetable_id, week_day, period_index, subject_id, staff_id)
                 VALUES(?, ?, ?, ?, ?)",
                (
                    &timetable_id,
                    day.week_day as i64,
                    p.period_index as i64,
                    &p.subject_id,
                    &p.staff_id,
                ),
            ) {
                let _ = tx.rollback();
                return err(
                    &req.id,
                    "db_insert_failed",
                    e.to_string(),
                    Some(json!({ "table": "timetable_periods" })),
                );
            }
            period_count += 1;
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    // Submission succeeded: the stored copy is now the source of truth and
    // the session is discarded.
    state.editor = None;

    ok(
        &req.id,
        json!({
            "timetableId": timetable_id,
            "dayCount": days.len(),
            "periodCount": period_count
        }),
    )
}

fn handle_editor_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.editor = None;
    ok(&req.id, json!({ "ok": true }))
}

fn handle_timetable_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let class_id = match req.params.get("classId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing classId", None),
    };

    let stored = match load_timetable(conn, &class_id) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(stored) = stored else {
        return err(&req.id, "not_found", "class has no timetable", None);
    };

    ok(
        &req.id,
        json!({
            "timetableId": stored.id,
            "classId": class_id,
            "groupId": stored.group_id,
            "totalPeriods": stored.total_periods,
            "activeFrom": stored.active_from,
            "timetableDays": timetable_days_json(&stored.days)
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.editor.open" => Some(handle_editor_open(state, req)),
        "timetable.editor.generate" => Some(handle_editor_generate(state, req)),
        "timetable.editor.openCell" => Some(handle_editor_open_cell(state, req)),
        "timetable.editor.searchSubjects" => Some(handle_editor_search_subjects(state, req)),
        "timetable.editor.searchStaff" => Some(handle_editor_search_staff(state, req)),
        "timetable.editor.saveCell" => Some(handle_editor_save_cell(state, req)),
        "timetable.editor.cancelCell" => Some(handle_editor_cancel_cell(state, req)),
        "timetable.editor.validate" => Some(handle_editor_validate(state, req)),
        "timetable.editor.submit" => Some(handle_editor_submit(state, req)),
        "timetable.editor.cancel" => Some(handle_editor_cancel(state, req)),
        "timetable.get" => Some(handle_timetable_get(state, req)),
        _ => None,
    }
}
