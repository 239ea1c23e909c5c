mod test_support;

use serde_json::json;
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn grade_bands_replace_validate_and_reject_overlaps() {
    let workspace = temp_dir("schooldesk-grading");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let school = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "schools.create",
        json!({ "name": "Meadow School" }),
    );
    let school_id = school["schoolId"].as_str().expect("schoolId").to_string();

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "C", "minPercent": 50.0, "maxPercent": 69.0 },
                { "grade": "A", "minPercent": 85.0, "maxPercent": 100.0 },
                { "grade": "B", "minPercent": 70.0, "maxPercent": 84.0 }
            ]
        }),
    );
    assert_eq!(saved["count"].as_i64(), Some(3));

    // Listed top band first regardless of submission order.
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grading.list",
        json!({ "schoolId": school_id }),
    );
    let grades: Vec<&str> = listed["boundaries"]
        .as_array()
        .expect("boundaries")
        .iter()
        .filter_map(|b| b["grade"].as_str())
        .collect();
    assert_eq!(grades, vec!["A", "B", "C"]);

    let overlapping = request(
        &mut stdin,
        &mut reader,
        "5",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "A", "minPercent": 80.0, "maxPercent": 100.0 },
                { "grade": "B", "minPercent": 60.0, "maxPercent": 85.0 }
            ]
        }),
    );
    assert_eq!(
        overlapping.pointer("/error/code").and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    let out_of_range = request(
        &mut stdin,
        &mut reader,
        "6",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "A", "minPercent": 90.0, "maxPercent": 105.0 }
            ]
        }),
    );
    assert_eq!(
        out_of_range.pointer("/error/code").and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    let inverted = request(
        &mut stdin,
        &mut reader,
        "7",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "A", "minPercent": 90.0, "maxPercent": 80.0 }
            ]
        }),
    );
    assert_eq!(
        inverted.pointer("/error/code").and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    let duplicate_label = request(
        &mut stdin,
        &mut reader,
        "8",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "A", "minPercent": 90.0, "maxPercent": 100.0 },
                { "grade": "A", "minPercent": 50.0, "maxPercent": 89.0 }
            ]
        }),
    );
    assert_eq!(
        duplicate_label
            .pointer("/error/code")
            .and_then(|v| v.as_str()),
        Some("validation_failed")
    );

    // Failed saves must not have clobbered the stored set.
    let still_there = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "grading.list",
        json!({ "schoolId": school_id }),
    );
    assert_eq!(
        still_there["boundaries"].as_array().map(|a| a.len()),
        Some(3)
    );

    // A replace with a smaller set drops the old bands.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "grading.save",
        json!({
            "schoolId": school_id,
            "boundaries": [
                { "grade": "Pass", "minPercent": 40.0, "maxPercent": 100.0 },
                { "grade": "Fail", "minPercent": 0.0, "maxPercent": 39.0 }
            ]
        }),
    );
    let replaced = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "grading.list",
        json!({ "schoolId": school_id }),
    );
    let grades: Vec<&str> = replaced["boundaries"]
        .as_array()
        .expect("boundaries")
        .iter()
        .filter_map(|b| b["grade"].as_str())
        .collect();
    assert_eq!(grades, vec!["Pass", "Fail"]);
}
