use attendance_core::{
    AttendanceEvent, AttendanceStatus, DocumentLoad, MarkRequest, NewStudent, PersistenceManager,
    RosterEvent, StoreError, StudentUpdate,
};
use std::sync::{Arc, Mutex};

fn seeded(dir: &std::path::Path) -> PersistenceManager {
    let mut manager = PersistenceManager::new(dir);
    manager.load_all().unwrap();

    let roster = manager.roster_mut();
    roster
        .add(
            NewStudent::new("s1", "Ada", "Lovelace")
                .with_email("ada@example.org")
                .with_group("TD1"),
        )
        .unwrap();
    roster
        .add(NewStudent::new("s2", "Alan", "Turing").with_group("TD2"))
        .unwrap();

    let attendance = manager.attendance_mut();
    attendance.create_session("2024-01-08", "Algebra", "first week");
    attendance.mark_attendance(
        MarkRequest::new("s1", "2024-01-08", AttendanceStatus::Present).with_time("08:00:00"),
    );
    attendance.mark_attendance(
        MarkRequest::new("s2", "2024-01-08", AttendanceStatus::Late).with_note("bus"),
    );
    attendance.mark_attendance(MarkRequest::new("s1", "2024-01-15", AttendanceStatus::Absent));
    manager
}

#[test]
fn save_then_load_reproduces_both_stores() {
    let dir = tempfile::tempdir().unwrap();
    let mut saved = seeded(dir.path());
    saved.save_all().unwrap();

    let mut reloaded = PersistenceManager::new(dir.path());
    let summary = reloaded.load_all().unwrap();

    assert!(matches!(summary.students, DocumentLoad::Loaded(ref report) if report.is_clean()));
    assert!(matches!(summary.attendance, DocumentLoad::Loaded(ref report) if report.loaded == 2));
    assert_eq!(reloaded.roster().to_document(), saved.roster().to_document());
    assert_eq!(
        reloaded.attendance().to_document(),
        saved.attendance().to_document()
    );
}

#[test]
fn persisted_documents_use_expected_keys() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    manager.save_all().unwrap();

    let students: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("students.json")).unwrap()).unwrap();
    assert_eq!(students["s1"]["student_id"], "s1");
    assert!(students["s1"]["created_date"].is_string());

    let attendance: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("attendance.json")).unwrap())
            .unwrap();
    let record = &attendance["2024-01-08"]["records"]["s2"];
    assert_eq!(record["status"], "Late");
    assert_eq!(record["note"], "bus");
    assert!(record["created_timestamp"].is_string());
}

#[test]
fn legacy_documents_with_french_labels_load() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("attendance.json"),
        r#"{
  "2024-02-01": {
    "date": "2024-02-01",
    "td_name": "TD1",
    "records": {
      "s1": {"student_id": "s1", "date": "2024-02-01", "status": "Présent", "notes": "ok"},
      "s2": {"student_id": "s2", "date": "2024-02-01", "status": "En retard"}
    }
  },
  "2024-02-02": {"date": "2024-02-02", "records": {"s1": {"student_id": "s1", "date": "2024-02-02", "status": "Sick"}}}
}"#,
    )
    .unwrap();

    let mut manager = PersistenceManager::new(dir.path());
    let summary = manager.load_all().unwrap();
    let DocumentLoad::Loaded(report) = summary.attendance else {
        panic!("attendance should load");
    };
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "2024-02-02");

    let session = manager.attendance().get_session("2024-02-01").unwrap();
    assert_eq!(session.label, "TD1");
    assert_eq!(session.records["s1"].status, AttendanceStatus::Present);
    assert_eq!(session.records["s1"].note, "ok");
    assert_eq!(session.records["s2"].status, AttendanceStatus::Late);
}

#[test]
fn marking_twice_keeps_one_record_with_latest_status() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    let attendance = manager.attendance_mut();

    attendance.mark_attendance(MarkRequest::new("s2", "2024-01-15", AttendanceStatus::Present));
    attendance.mark_attendance(MarkRequest::new("s2", "2024-01-15", AttendanceStatus::Absent));

    let session = attendance.get_session("2024-01-15").unwrap();
    assert_eq!(session.len(), 2);
    assert_eq!(
        attendance.get_record("s2", "2024-01-15").unwrap().status,
        AttendanceStatus::Absent
    );
}

#[test]
fn session_label_is_first_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PersistenceManager::new(dir.path());
    let attendance = manager.attendance_mut();

    attendance.create_session("2024-03-01", "", "");
    attendance.mark_attendance(
        MarkRequest::new("s1", "2024-03-01", AttendanceStatus::Present).with_label("L1"),
    );
    attendance.mark_attendance(
        MarkRequest::new("s2", "2024-03-01", AttendanceStatus::Present).with_label("L2"),
    );

    assert_eq!(attendance.get_session("2024-03-01").unwrap().label, "L1");
    assert_eq!(attendance.get_record("s2", "2024-03-01").unwrap().label, "L2");
}

#[test]
fn range_filter_is_inclusive_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PersistenceManager::new(dir.path());
    let attendance = manager.attendance_mut();
    for day in (1..=31).rev() {
        attendance.create_session(&format!("2024-01-{day:02}"), "", "");
    }

    let dates: Vec<&str> = attendance
        .get_sessions_in_range("2024-01-10", "2024-01-20")
        .into_iter()
        .map(|session| session.date.as_str())
        .collect();
    assert_eq!(dates.len(), 11);
    assert_eq!(dates.first(), Some(&"2024-01-10"));
    assert_eq!(dates.last(), Some(&"2024-01-20"));
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn roster_rejects_duplicates_and_unknown_ids() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    let roster = manager.roster_mut();

    assert_eq!(
        roster.add(NewStudent::new(" s1 ", "Other", "Person")).unwrap_err(),
        StoreError::DuplicateStudent("s1".to_string())
    );
    assert!(matches!(
        roster.add(NewStudent::new("s3", "Grace", "Hopper").with_email("nope")),
        Err(StoreError::Validation(_))
    ));
    assert_eq!(
        roster.delete("ghost").unwrap_err(),
        StoreError::StudentNotFound("ghost".to_string())
    );

    let updated = roster
        .update(
            "s2",
            StudentUpdate {
                group: Some("TD1".to_string()),
                ..StudentUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.id, "s2");
    assert_eq!(roster.students_in_group("td1").len(), 2);
    assert_eq!(roster.groups(), vec!["TD1".to_string()]);
    assert_eq!(roster.search("LOVE").len(), 1);
}

#[test]
fn subscribers_see_events_in_order_per_store() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PersistenceManager::new(dir.path());

    let roster_log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&roster_log);
    manager
        .roster_mut()
        .subscribe(move |event: &RosterEvent| sink.lock().unwrap().push(event.name()));

    let attendance_log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&attendance_log);
    manager.attendance_mut().subscribe(move |event: &AttendanceEvent| {
        sink.lock()
            .unwrap()
            .push((event.name(), event.date().map(str::to_string)))
    });

    manager
        .roster_mut()
        .add(NewStudent::new("s1", "Ada", "Lovelace"))
        .unwrap();
    manager.attendance_mut().mark_attendance(MarkRequest::new(
        "s1",
        "2024-01-08",
        AttendanceStatus::Present,
    ));
    manager
        .attendance_mut()
        .delete_record("s1", "2024-01-08")
        .unwrap();
    manager.roster_mut().delete("s1").unwrap();
    manager.reset();

    assert_eq!(*roster_log.lock().unwrap(), vec!["add", "delete", "load"]);
    let date = Some("2024-01-08".to_string());
    assert_eq!(
        *attendance_log.lock().unwrap(),
        vec![
            ("session_created", date.clone()),
            ("attendance_marked", date.clone()),
            ("attendance_deleted", date),
            ("load", None),
        ]
    );
}

#[test]
fn orphan_records_are_reported_not_removed() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    manager
        .attendance_mut()
        .mark_attendance(MarkRequest::new("gone", "2024-01-08", AttendanceStatus::Absent));

    let orphans = manager.attendance().orphan_student_ids(manager.roster());
    assert_eq!(orphans, vec!["gone".to_string()]);
    assert_eq!(manager.attendance().get_records_for_student("gone").len(), 1);
    assert_eq!(manager.statistics().all_student_stats().len(), 2);
}

#[test]
fn deleting_a_session_removes_it_and_announces_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager
        .attendance_mut()
        .subscribe(move |event: &AttendanceEvent| sink.lock().unwrap().push(event.clone()));

    let removed = manager.attendance_mut().delete_session("2024-01-08").unwrap();
    assert_eq!(removed.records.len(), 2);
    assert!(manager.attendance().get_session("2024-01-08").is_none());
    assert_eq!(
        manager.attendance_mut().delete_session("2024-01-08").unwrap_err(),
        StoreError::SessionNotFound("2024-01-08".to_string())
    );
    assert_eq!(
        *events.lock().unwrap(),
        vec![AttendanceEvent::SessionDeleted("2024-01-08".to_string())]
    );
}

#[test]
fn date_range_spans_first_and_last_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PersistenceManager::new(dir.path());
    assert_eq!(manager.attendance().date_range(), None);

    let attendance = manager.attendance_mut();
    for date in ["2024-03-10", "2024-01-02", "2024-02-20"] {
        attendance.create_session(date, "", "");
    }
    assert_eq!(attendance.date_range(), Some(("2024-01-02", "2024-03-10")));
}

#[test]
fn summaries_count_statuses_per_student_and_overall() {
    let dir = tempfile::tempdir().unwrap();
    let manager = seeded(dir.path());
    let attendance = manager.attendance();

    let ada = attendance.summary_for_student("s1");
    assert_eq!((ada.total, ada.present, ada.absent, ada.late), (2, 1, 1, 0));
    let nobody = attendance.summary_for_student("ghost");
    assert_eq!(nobody.total, 0);

    let overall = attendance.overall_counts();
    assert_eq!(overall.total_sessions, 2);
    assert_eq!(overall.total_records, 3);
    assert_eq!(overall.status_counts.present, 1);
    assert_eq!(overall.status_counts.late, 1);
    assert_eq!(overall.status_counts.absent, 1);
}

#[test]
fn session_labels_are_trimmed_distinct_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PersistenceManager::new(dir.path());
    let attendance = manager.attendance_mut();
    attendance.create_session("2024-01-01", " TD2 ", "");
    attendance.create_session("2024-01-02", "TD1", "");
    attendance.create_session("2024-01-03", "TD2", "");
    attendance.create_session("2024-01-04", "   ", "");
    attendance.create_session("2024-01-05", "", "");

    assert_eq!(
        attendance.distinct_session_labels(),
        vec!["TD1".to_string(), "TD2".to_string()]
    );
}

#[test]
fn mark_many_writes_one_record_per_student() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = seeded(dir.path());
    let attendance = manager.attendance_mut();

    let marked = attendance.mark_many(
        ["s1", "s2", "s3"],
        "2024-01-22",
        AttendanceStatus::Late,
        "Lab",
    );
    assert_eq!(marked, 3);

    let session = attendance.get_session("2024-01-22").unwrap();
    assert_eq!(session.label, "Lab");
    assert_eq!(session.len(), 3);
    assert!(session
        .records
        .values()
        .all(|record| record.status == AttendanceStatus::Late));
    let none = attendance.mark_many(
        std::iter::empty(),
        "2024-01-23",
        AttendanceStatus::Present,
        "",
    );
    assert_eq!(none, 0);
    assert!(attendance.get_session("2024-01-23").is_none());
}

#[test]
fn loaded_entries_predating_id_and_email_rules_survive_a_save() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("students.json"),
        r#"{
  "A": {"student_id": "A", "first_name": "Ann", "last_name": "Lee"},
  "s2": {"student_id": "s2", "first_name": "Bo", "last_name": "Diddley", "email": "bo"},
  "s3": {"student_id": "s3", "first_name": "", "last_name": "Blank"}
}"#,
    )
    .unwrap();

    let mut manager = PersistenceManager::new(dir.path());
    let summary = manager.load_all().unwrap();
    let DocumentLoad::Loaded(report) = summary.students else {
        panic!("students should load");
    };
    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "s3");

    manager.save_all().unwrap();
    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("students.json")).unwrap()).unwrap();
    assert_eq!(saved["A"]["first_name"], "Ann");
    assert_eq!(saved["s2"]["email"], "bo");
}
