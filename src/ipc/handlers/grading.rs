use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use uuid::Uuid;

struct Band {
    grade: String,
    min_percent: f64,
    max_percent: f64,
}

/// Bands must each sit inside 0..=100 and may not overlap; labels are
/// unique. Returns the parsed set sorted by descending minimum.
fn parse_bands(raw: &[serde_json::Value]) -> Result<Vec<Band>, (String, serde_json::Value)> {
    let mut bands = Vec::with_capacity(raw.len());
    for (i, v) in raw.iter().enumerate() {
        let Some(obj) = v.as_object() else {
            return Err((
                format!("boundary at index {} must be an object", i),
                json!({ "index": i }),
            ));
        };
        let grade = obj
            .get("grade")
            .and_then(|g| g.as_str())
            .map(|g| g.trim().to_string())
            .unwrap_or_default();
        if grade.is_empty() {
            return Err((
                format!("boundary at index {} is missing grade", i),
                json!({ "index": i }),
            ));
        }
        let min_percent = match obj.get("minPercent").and_then(|m| m.as_f64()) {
            Some(m) => m,
            None => {
                return Err((
                    format!("boundary at index {} is missing minPercent", i),
                    json!({ "index": i, "grade": grade }),
                ))
            }
        };
        let max_percent = match obj.get("maxPercent").and_then(|m| m.as_f64()) {
            Some(m) => m,
            None => {
                return Err((
                    format!("boundary at index {} is missing maxPercent", i),
                    json!({ "index": i, "grade": grade }),
                ))
            }
        };
        if !(0.0..=100.0).contains(&min_percent)
            || !(0.0..=100.0).contains(&max_percent)
            || min_percent > max_percent
        {
            return Err((
                format!("grade {} must satisfy 0 <= min <= max <= 100", grade),
                json!({ "grade": grade, "minPercent": min_percent, "maxPercent": max_percent }),
            ));
        }
        if bands.iter().any(|b: &Band| b.grade == grade) {
            return Err((
                format!("duplicate grade label: {}", grade),
                json!({ "grade": grade }),
            ));
        }
        bands.push(Band {
            grade,
            min_percent,
            max_percent,
        });
    }

    bands.sort_by(|a, b| {
        b.min_percent
            .partial_cmp(&a.min_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for pair in bands.windows(2) {
        // Sorted descending: the lower band must end below the upper's start.
        if pair[1].max_percent >= pair[0].min_percent {
            return Err((
                format!("grades {} and {} overlap", pair[0].grade, pair[1].grade),
                json!({ "upper": pair[0].grade, "lower": pair[1].grade }),
            ));
        }
    }
    Ok(bands)
}

fn handle_grading_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };

    let mut stmt = match conn.prepare(
        "SELECT grade, min_percent, max_percent FROM grade_boundaries
         WHERE school_id = ? ORDER BY sort_order",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&school_id], |row| {
            let grade: String = row.get(0)?;
            let min_percent: f64 = row.get(1)?;
            let max_percent: f64 = row.get(2)?;
            Ok(json!({
                "grade": grade,
                "minPercent": min_percent,
                "maxPercent": max_percent
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(boundaries) => ok(&req.id, json!({ "boundaries": boundaries })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_grading_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let school_id = match req.params.get("schoolId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing schoolId", None),
    };
    let Some(raw) = req.params.get("boundaries").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing boundaries[]", None);
    };

    let bands = match parse_bands(raw) {
        Ok(v) => v,
        Err((message, details)) => {
            return err(&req.id, "validation_failed", message, Some(details))
        }
    };

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    if let Err(e) = tx.execute(
        "DELETE FROM grade_boundaries WHERE school_id = ?",
        [&school_id],
    ) {
        let _ = tx.rollback();
        return err(&req.id, "db_delete_failed", e.to_string(), None);
    }

    for (i, band) in bands.iter().enumerate() {
        let row_id = Uuid::new_v4().to_string();
        if let Err(e) = tx.execute(
            "INSERT INTO grade_boundaries(id, school_id, grade, min_percent, max_percent, sort_order)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &row_id,
                &school_id,
                &band.grade,
                band.min_percent,
                band.max_percent,
                i as i64,
            ),
        ) {
            let _ = tx.rollback();
            return err(
                &req.id,
                "db_insert_failed",
                e.to_string(),
                Some(json!({ "table": "grade_boundaries" })),
            );
        }
    }

    if let Err(e) = tx.commit() {
        return err(&req.id, "db_commit_failed", e.to_string(), None);
    }

    ok(&req.id, json!({ "ok": true, "count": bands.len() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grading.list" => Some(handle_grading_list(state, req)),
        "grading.save" => Some(handle_grading_save(state, req)),
        _ => None,
    }
}
