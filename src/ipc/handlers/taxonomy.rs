use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::OptionalExtension;
use serde_json::json;
use uuid::Uuid;

/// Named lookup vocabularies managed per school. One table, discriminated by
/// kind, keeps the seven screens on a single handler.
#[derive(Clone, Copy)]
enum TermKind {
    Syllabus,
    Standard,
    Medium,
    Section,
    Group,
    Religion,
    Caste,
}

impl TermKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "syllabus" => Some(Self::Syllabus),
            "standard" => Some(Self::Standard),
            "medium" => Some(Self::Medium),
            "section" => Some(Self::Section),
            "group" => Some(Self::Group),
            "religion" => Some(Self::Religion),
            "caste" => Some(Self::Caste),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Syllabus => "syllabus",
            Self::Standard => "standard",
            Self::Medium => "medium",
            Self::Section => "section",
            Self::Group => "group",
            Self::Religion => "religion",
            Self::Caste => "caste",
        }
    }
}

fn parse_scope(req: &Request) -> Result<(String, TermKind), serde_json::Value> {
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return Err(err(&req.id, "bad_params", "missing schoolId", None)),
    };
    let kind = match req
        .params
        .get("kind")
        .and_then(|v| v.as_str())
        .and_then(TermKind::parse)
    {
        Some(k) => k,
        None => {
            return Err(err(
                &req.id,
                "bad_params",
                "kind must be one of: syllabus, standard, medium, section, group, religion, caste",
                None,
            ))
        }
    };
    Ok((school_id, kind))
}

fn handle_taxonomy_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (school_id, kind) = match parse_scope(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut stmt = match conn.prepare(
        "SELECT id, name FROM taxonomy_terms
         WHERE school_id = ? AND kind = ?
         ORDER BY sort_order, name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map((&school_id, kind.key()), |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(terms) => ok(&req.id, json!({ "kind": kind.key(), "terms": terms })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_taxonomy_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (school_id, kind) = match parse_scope(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM taxonomy_terms WHERE school_id = ? AND kind = ? AND name = ?",
            (&school_id, kind.key(), &name),
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
            format!("{} already has an entry named {}", kind.key(), name),
            Some(json!({ "kind": kind.key(), "name": name })),
        );
    }

    let next_order: i64 = match conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM taxonomy_terms
         WHERE school_id = ? AND kind = ?",
        (&school_id, kind.key()),
        |r| r.get(0),
    ) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let term_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO taxonomy_terms(id, school_id, kind, name, sort_order)
         VALUES(?, ?, ?, ?, ?)",
        (&term_id, &school_id, kind.key(), &name, next_order),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "taxonomy_terms" })),
        );
    }

    ok(
        &req.id,
        json!({ "termId": term_id, "kind": kind.key(), "name": name }),
    )
}

fn handle_taxonomy_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let term_id = match req.params.get("termId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing termId", None),
    };
    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let scope: Option<(String, String)> = match conn
        .query_row(
            "SELECT school_id, kind FROM taxonomy_terms WHERE id = ?",
            [&term_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let Some((school_id, kind)) = scope else {
        return err(&req.id, "not_found", "term not found", None);
    };

    let taken: Option<i64> = match conn
        .query_row(
            "SELECT 1 FROM taxonomy_terms
             WHERE school_id = ? AND kind = ? AND name = ? AND id != ?",
            (&school_id, &kind, &name, &term_id),
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
            format!("{} already has an entry named {}", kind, name),
            Some(json!({ "kind": kind, "name": name })),
        );
    }

    if let Err(e) = conn.execute(
        "UPDATE taxonomy_terms SET name = ? WHERE id = ?",
        (&name, &term_id),
    ) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "termId": term_id, "name": name }))
}

fn handle_taxonomy_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let term_id = match req.params.get("termId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing termId", None),
    };

    let deleted = match conn.execute("DELETE FROM taxonomy_terms WHERE id = ?", [&term_id]) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_delete_failed", e.to_string(), None),
    };
    if deleted == 0 {
        return err(&req.id, "not_found", "term not found", None);
    }

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "taxonomy.list" => Some(handle_taxonomy_list(state, req)),
        "taxonomy.create" => Some(handle_taxonomy_create(state, req)),
        "taxonomy.rename" => Some(handle_taxonomy_rename(state, req)),
        "taxonomy.delete" => Some(handle_taxonomy_delete(state, req)),
        _ => None,
    }
}
