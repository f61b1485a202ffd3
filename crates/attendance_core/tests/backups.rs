use attendance_core::{BackupKind, ConfigLoad, NewStudent, PersistenceError, PersistenceManager};

fn manager_with_student(dir: &std::path::Path) -> PersistenceManager {
    let mut manager = PersistenceManager::new(dir);
    manager.load_all().unwrap();
    manager
        .roster_mut()
        .add(NewStudent::new("s1", "Ada", "Lovelace"))
        .unwrap();
    manager
}

#[test]
fn rotation_keeps_the_newest_bundles() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());
    assert_eq!(manager.config().backup_count, 5);

    let mut created = Vec::new();
    for _ in 0..7 {
        created.push(manager.create_backup(None).unwrap().name);
    }

    let remaining: Vec<String> = manager
        .list_backups()
        .unwrap()
        .into_iter()
        .map(|info| info.name)
        .collect();
    let mut expected: Vec<String> = created[2..].to_vec();
    expected.reverse();
    assert_eq!(remaining, expected);
    assert!(manager.config().last_backup.is_some());
}

#[test]
fn backup_reflects_unsaved_memory_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());

    let info = manager.create_backup(Some("term-1")).unwrap();
    assert_eq!(info.kind, BackupKind::Manual);
    let students: serde_json::Value =
        serde_json::from_slice(&std::fs::read(info.path.join("students.json")).unwrap()).unwrap();
    assert_eq!(students["s1"]["last_name"], "Lovelace");
    assert!(info.path.join("config.json").is_file());
    assert!(info.path.join("attendance.json").is_file());
}

#[test]
fn explicit_name_overwrites_existing_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());
    manager.create_backup(Some("weekly")).unwrap();

    manager
        .roster_mut()
        .add(NewStudent::new("s2", "Alan", "Turing"))
        .unwrap();
    let info = manager.create_backup(Some("weekly")).unwrap();

    let students: serde_json::Value =
        serde_json::from_slice(&std::fs::read(info.path.join("students.json")).unwrap()).unwrap();
    assert!(students.get("s2").is_some());
    assert_eq!(manager.list_backups().unwrap().len(), 1);
}

#[test]
fn unsafe_or_reserved_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());

    for name in ["../outside", "before_restore", ".hidden", "a/b"] {
        assert!(matches!(
            manager.create_backup(Some(name)),
            Err(PersistenceError::InvalidBackupName(_))
        ));
    }
    assert!(manager.list_backups().unwrap().is_empty());
}

#[test]
fn restore_reloads_stores_and_keeps_one_safety_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());
    manager.create_backup(Some("baseline")).unwrap();

    manager
        .roster_mut()
        .add(NewStudent::new("s2", "Alan", "Turing"))
        .unwrap();
    manager.restore_backup("baseline").unwrap();
    assert_eq!(manager.roster().count(), 1);
    assert!(manager.roster().get("s2").is_none());

    manager
        .roster_mut()
        .add(NewStudent::new("s3", "Grace", "Hopper"))
        .unwrap();
    manager.restore_backup("baseline").unwrap();
    manager.restore_backup("baseline").unwrap();

    let backups = manager.list_backups().unwrap();
    let safety: Vec<_> = backups
        .iter()
        .filter(|info| info.kind == BackupKind::BeforeRestore)
        .collect();
    assert_eq!(safety.len(), 1);
    assert_eq!(safety[0].name, "before_restore");
    assert_eq!(backups.len(), 2);
}

#[test]
fn safety_bundle_captures_state_before_restore() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());
    manager.create_backup(Some("baseline")).unwrap();
    manager
        .roster_mut()
        .add(NewStudent::new("s2", "Alan", "Turing"))
        .unwrap();

    manager.restore_backup("baseline").unwrap();
    assert_eq!(manager.roster().count(), 1);

    manager.restore_backup("before_restore").unwrap();
    assert!(manager.roster().get("s2").is_some());
}

#[test]
fn restoring_missing_bundle_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());

    for name in ["nope", "../students.json", ""] {
        assert!(matches!(
            manager.restore_backup(name),
            Err(PersistenceError::BackupNotFound(_))
        ));
    }
    assert_eq!(manager.roster().count(), 1);
    assert!(manager.list_backups().unwrap().is_empty());
}

#[test]
fn disabled_rotation_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager_with_student(dir.path());
    manager.config_mut().backup_enabled = false;
    manager.config_mut().backup_count = 2;

    for _ in 0..4 {
        manager.create_backup(None).unwrap();
    }
    assert_eq!(manager.list_backups().unwrap().len(), 4);
}

#[test]
fn malformed_config_is_replaced_with_defaults_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = manager_with_student(dir.path());
    first.save_all().unwrap();
    std::fs::write(dir.path().join("config.json"), r#"{"backup_count": "lots"}"#).unwrap();

    let mut manager = PersistenceManager::new(dir.path());
    let summary = manager.load_all().unwrap();
    assert!(matches!(summary.config, ConfigLoad::Recovered(_)));
    assert_eq!(manager.config().backup_count, 5);
    assert_eq!(manager.roster().count(), 1);

    let rewritten: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("config.json")).unwrap()).unwrap();
    assert_eq!(rewritten["backup_count"], 5);
}
