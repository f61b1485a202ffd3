use attendance_core::{
    AttendanceStatus, BackupKind, MarkRequest, NewStudent, PersistenceError, PersistenceManager,
};
use serde_json::json;

fn seeded(dir: &std::path::Path) -> PersistenceManager {
    let mut manager = PersistenceManager::new(dir);
    manager.load_all().unwrap();
    manager
        .roster_mut()
        .add(NewStudent::new("s1", "Ada", "Lovelace"))
        .unwrap();
    manager
        .attendance_mut()
        .mark_attendance(MarkRequest::new("s1", "2024-01-08", AttendanceStatus::Late));
    manager
}

#[test]
fn export_writes_one_combined_document() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manager = seeded(data.path());

    let path = out.path().join("export.json");
    manager.export(&path).unwrap();

    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(document["export_date"].is_string());
    assert_eq!(document["app_info"]["name"], "Attendance Tracker");
    assert_eq!(document["students"]["s1"]["first_name"], "Ada");
    assert_eq!(
        document["attendance"]["2024-01-08"]["records"]["s1"]["status"],
        "Late"
    );
    assert_eq!(document["config"]["backup_count"], 5);
    assert!(data.path().join("students.json").is_file());
}

#[test]
fn export_then_import_into_fresh_directory_round_trips() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let path = out.path().join("export.json");
    let mut exporter = seeded(source.path());
    exporter.export(&path).unwrap();

    let mut importer = PersistenceManager::new(target.path());
    importer.load_all().unwrap();
    let summary = importer.import(&path).unwrap();

    assert_eq!(summary.students.unwrap().loaded, 1);
    assert_eq!(summary.attendance.unwrap().loaded, 1);
    assert!(summary.config_merged);
    assert_eq!(importer.roster().to_document(), exporter.roster().to_document());
    assert_eq!(
        importer.attendance().to_document(),
        exporter.attendance().to_document()
    );
}

#[test]
fn import_merges_config_but_keeps_local_identity() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manager = seeded(data.path());
    let created_date = manager.config().created_date.clone();
    assert!(manager.config().auto_save);

    let path = out.path().join("import.json");
    std::fs::write(
        &path,
        serde_json::to_vec_pretty(&json!({
            "export_date": "2024-05-01T10:00:00+02:00",
            "students": {
                "s9": {"student_id": "s9", "first_name": "Alan", "last_name": "Turing"}
            },
            "config": {
                "auto_save": false,
                "created_date": "1999-01-01T00:00:00+00:00",
                "theme": "dark"
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let summary = manager.import(&path).unwrap();
    assert!(summary.attendance.is_none());
    assert!(!manager.config().auto_save);
    assert_eq!(manager.config().created_date, created_date);
    assert_eq!(manager.config().extra.get("theme"), Some(&json!("dark")));

    assert!(manager.roster().get("s9").is_some());
    assert!(manager.roster().get("s1").is_none());
    assert_eq!(manager.attendance().session_count(), 1);

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(data.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(on_disk["auto_save"], false);
    assert_eq!(on_disk["created_date"], json!(created_date));

    let safety = manager
        .list_backups()
        .unwrap()
        .into_iter()
        .find(|info| info.kind == BackupKind::BeforeImport)
        .unwrap();
    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(safety.path.join("students.json")).unwrap())
            .unwrap();
    assert!(saved.get("s1").is_some());
}

#[test]
fn malformed_import_leaves_state_untouched() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut manager = seeded(data.path());

    let wrong_shape = out.path().join("wrong.json");
    std::fs::write(&wrong_shape, r#"{"students": [1, 2, 3]}"#).unwrap();
    assert!(matches!(
        manager.import(&wrong_shape),
        Err(PersistenceError::InvalidDocument { .. })
    ));

    let bad_config = out.path().join("bad_config.json");
    std::fs::write(
        &bad_config,
        r#"{"students": {}, "config": {"backup_count": "lots"}}"#,
    )
    .unwrap();
    assert!(matches!(
        manager.import(&bad_config),
        Err(PersistenceError::InvalidDocument { .. })
    ));

    assert!(manager.import(&out.path().join("missing.json")).is_err());
    assert_eq!(manager.roster().count(), 1);
    assert_eq!(manager.config().backup_count, 5);
}

#[test]
fn file_info_reports_saved_documents() {
    let data = tempfile::tempdir().unwrap();
    let mut manager = seeded(data.path());

    let before = manager.file_info();
    assert!(before.config.exists);
    assert!(!before.students.exists);

    manager.save_all().unwrap();
    let after = manager.file_info();
    assert!(after.students.exists);
    assert!(after.students.size > 0);
    assert!(after.attendance.modified.is_some());
}
