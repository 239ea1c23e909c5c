mod test_support;

use serde_json::json;
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn deleting_a_class_removes_its_timetable_and_detaches_students() {
    let workspace = temp_dir("schooldesk-class-delete");
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
        json!({ "name": "Fernwood School" }),
    );
    let school_id = school["schoolId"].as_str().expect("schoolId").to_string();

    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.create",
        json!({ "schoolId": school_id, "name": "Geography" }),
    );
    let subject_id = subject["subjectId"].as_str().expect("subjectId").to_string();
    let staff = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "staff.create",
        json!({ "schoolId": school_id, "name": "K. Patel", "registrationNo": "REG-7" }),
    );
    let staff_id = staff["staffId"].as_str().expect("staffId").to_string();
    let class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classes.create",
        json!({ "schoolId": school_id, "name": "Grade 2-A" }),
    );
    let class_id = class["classId"].as_str().expect("classId").to_string();
    let group = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "workingDays.create",
        json!({ "schoolId": school_id, "groupName": "Mon only", "days": [1] }),
    );
    let group_id = group["groupId"].as_str().expect("groupId").to_string();

    let student = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.create",
        json!({
            "schoolId": school_id,
            "name": "Asha Rao",
            "admissionNo": "ADM-001",
            "classId": class_id
        }),
    );
    let student_id = student["studentId"].as_str().expect("studentId").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "timetable.editor.open",
        json!({ "schoolId": school_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "timetable.editor.generate",
        json!({ "classId": class_id, "groupId": group_id, "totalPeriods": 1 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "timetable.editor.openCell",
        json!({ "weekDay": 1, "periodIndex": 1 }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "timetable.editor.saveCell",
        json!({ "subjectId": subject_id, "staffId": staff_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "timetable.editor.submit",
        json!({ "activeFrom": "2026-06-01" }),
    );

    // While the timetable references them, subject and staff cannot go.
    let subject_blocked = request(
        &mut stdin,
        &mut reader,
        "13",
        "subjects.delete",
        json!({ "subjectId": subject_id }),
    );
    assert_eq!(
        subject_blocked
            .pointer("/error/code")
            .and_then(|v| v.as_str()),
        Some("conflict")
    );
    let staff_blocked = request(
        &mut stdin,
        &mut reader,
        "14",
        "staff.delete",
        json!({ "staffId": staff_id }),
    );
    assert_eq!(
        staff_blocked.pointer("/error/code").and_then(|v| v.as_str()),
        Some("conflict")
    );
    let group_blocked = request(
        &mut stdin,
        &mut reader,
        "15",
        "workingDays.delete",
        json!({ "groupId": group_id }),
    );
    assert_eq!(
        group_blocked.pointer("/error/code").and_then(|v| v.as_str()),
        Some("conflict")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "classes.delete",
        json!({ "classId": class_id }),
    );

    let timetable_gone = request(
        &mut stdin,
        &mut reader,
        "17",
        "timetable.get",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        timetable_gone
            .pointer("/error/code")
            .and_then(|v| v.as_str()),
        Some("not_found")
    );

    // The student stays on the roll, detached from the deleted class.
    let students = request_ok(
        &mut stdin,
        &mut reader,
        "18",
        "students.list",
        json!({ "schoolId": school_id }),
    );
    let rows = students["students"].as_array().expect("students");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"].as_str(), Some(student_id.as_str()));
    assert!(rows[0]["classId"].is_null());

    // With the timetable gone the reference data is deletable again.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "subjects.delete",
        json!({ "subjectId": subject_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "staff.delete",
        json!({ "staffId": staff_id }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "workingDays.delete",
        json!({ "groupId": group_id }),
    );
}
