mod test_support;

use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir};

#[test]
fn generate_fill_validate_submit_round_trip() {
    let workspace = temp_dir("schooldesk-editor-flow");
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
        json!({ "name": "Northgate Public School" }),
    );
    let school_id = school["schoolId"].as_str().expect("schoolId").to_string();

    let math = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "schoolId": school_id, "name": "Math" }),
    );
    let math_id = math["subjectId"].as_str().expect("subjectId").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.create",
        json!({ "schoolId": school_id, "name": "Science" }),
    );

    let doe = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "staff.create",
        json!({ "schoolId": school_id, "name": "J. Doe", "registrationNo": "REG-1001" }),
    );
    let doe_id = doe["staffId"].as_str().expect("staffId").to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "staff.create",
        json!({ "schoolId": school_id, "name": "R. Roe", "registrationNo": "REG-2002" }),
    );

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "classes.create",
        json!({ "schoolId": school_id, "name": "Grade 6-A" }),
    );
    let class_id = class["classId"].as_str().expect("classId").to_string();

    let group = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "workingDays.create",
        json!({ "schoolId": school_id, "groupName": "5-day week", "days": [1, 2, 3, 4, 5] }),
    );
    let group_id = group["groupId"].as_str().expect("groupId").to_string();

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.editor.open",
        json!({ "schoolId": school_id }),
    );
    assert_eq!(opened["groups"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(opened["subjects"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(opened["staff"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(opened["classes"].as_array().map(|a| a.len()), Some(1));
    assert!(opened["existing"].is_null());

    let generated = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "timetable.editor.generate",
        json!({ "classId": class_id, "groupId": group_id, "totalPeriods": 3 }),
    );
    assert_eq!(
        generated.pointer("/editMode").and_then(|v| v.as_bool()),
        Some(false)
    );
    let days = generated
        .pointer("/grid/days")
        .and_then(|v| v.as_array())
        .expect("grid days");
    assert_eq!(days.len(), 5);
    assert_eq!(days[0]["dayName"].as_str(), Some("Monday"));
    assert_eq!(days[4]["dayName"].as_str(), Some("Friday"));
    for day in days {
        let slots = day["slots"].as_array().expect("slots");
        assert_eq!(slots.len(), 3);
        assert!(slots.iter().all(|s| s.is_null()));
    }

    let cell = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "timetable.editor.openCell",
        json!({ "weekDay": 1, "periodIndex": 1 }),
    );
    assert!(cell["current"].is_null());
    assert_eq!(cell["dayName"].as_str(), Some("Monday"));

    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "timetable.editor.saveCell",
        json!({ "subjectId": math_id, "staffId": doe_id }),
    );
    assert_eq!(saved["label"].as_str(), Some("Math/J. Doe"));

    // Monday periods 2 and 3 (0-based indices 1 and 2) are still empty.
    let report = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "timetable.editor.validate",
        json!({}),
    );
    assert_eq!(report["complete"].as_bool(), Some(false));
    assert_eq!(
        report.pointer("/emptyByDay/1"),
        Some(&json!([1, 2])),
    );
    assert_eq!(
        report.pointer("/emptyByDay/2"),
        Some(&json!([0, 1, 2])),
    );

    // Reopening the filled cell seeds the pickers with the saved pair.
    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "timetable.editor.openCell",
        json!({ "weekDay": 1, "periodIndex": 1 }),
    );
    assert_eq!(
        reopened.pointer("/current/subjectName").and_then(|v| v.as_str()),
        Some("Math")
    );
    assert_eq!(
        reopened.pointer("/current/staffName").and_then(|v| v.as_str()),
        Some("J. Doe")
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "timetable.editor.cancelCell",
        json!({}),
    );

    for day in 1..=5u8 {
        for period in 1..=3usize {
            if day == 1 && period == 1 {
                continue;
            }
            let open_id = format!("open-{}-{}", day, period);
            let _ = request_ok(
                &mut stdin,
                &mut reader,
                &open_id,
                "timetable.editor.openCell",
                json!({ "weekDay": day, "periodIndex": period }),
            );
            let save_id = format!("save-{}-{}", day, period);
            let _ = request_ok(
                &mut stdin,
                &mut reader,
                &save_id,
                "timetable.editor.saveCell",
                json!({ "subjectId": math_id, "staffId": doe_id }),
            );
        }
    }

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "timetable.editor.validate",
        json!({}),
    );
    assert_eq!(report["complete"].as_bool(), Some(true));
    assert_eq!(report["emptyByDay"], json!({}));

    let submitted = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "timetable.editor.submit",
        json!({ "activeFrom": "2026-06-01" }),
    );
    assert_eq!(submitted["dayCount"].as_i64(), Some(5));
    assert_eq!(submitted["periodCount"].as_i64(), Some(15));
    let timetable_id = submitted["timetableId"].as_str().expect("timetableId");

    let stored = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "timetable.get",
        json!({ "classId": class_id }),
    );
    assert_eq!(stored["timetableId"].as_str(), Some(timetable_id));
    assert_eq!(stored["activeFrom"].as_str(), Some("2026-06-01"));
    let stored_days = stored["timetableDays"].as_array().expect("days");
    assert_eq!(stored_days.len(), 5);
    for day in stored_days {
        assert_eq!(day["periods"].as_array().map(|p| p.len()), Some(3));
    }
    assert_eq!(
        stored.pointer("/timetableDays/0/periods/0/subject_id").and_then(|v| v.as_str()),
        Some(math_id.as_str())
    );
}
