use super::*;

fn global(config: Option<String>, db: Option<String>) -> GlobalArgs {
    GlobalArgs {
        verbose: 0,
        config,
        db,
    }
}

#[test]
fn test_column_widths_use_widest_cell() {
    let rows = vec![
        vec!["1".to_string(), "bootstrap_or_legacy_import".to_string()],
        vec!["10".to_string(), "x".to_string()],
    ];
    assert_eq!(calculate_column_widths(&["version", "step"], &rows), vec![7, 26]);
}

#[test]
fn test_spinner_detaches_on_drop() {
    let events = Arc::new(EventBus::new());
    {
        let _spinner = SlowOperationSpinner::attach(&events);
        assert_eq!(events.listener_count(), 1);
        events.emit(&MigrationEvent::SlowOperationStarted {
            title: "Upgrading".to_string(),
            message: "working".to_string(),
        });
        events.emit(&MigrationEvent::SlowOperationPulse);
    }
    assert_eq!(events.listener_count(), 0);
}

#[test]
fn test_config_relative_db_path_resolves_against_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("tunevault.yml");
    std::fs::write(&config_path, "database:\n  path: data/library.duckdb\n").unwrap();

    let ctx = load_context(&global(Some(config_path.display().to_string()), None)).unwrap();
    assert_eq!(ctx.db_path, dir.path().join("data/library.duckdb"));
}

#[test]
fn test_db_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("tunevault.yml");
    std::fs::write(&config_path, "database:\n  path: ignored.duckdb\n").unwrap();
    let db = dir.path().join("other.duckdb");

    let ctx = load_context(&global(
        Some(config_path.display().to_string()),
        Some(db.display().to_string()),
    ))
    .unwrap();
    assert_eq!(ctx.db_path, db);
}

#[test]
fn test_missing_explicit_config_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yml");
    assert!(load_context(&global(Some(missing.display().to_string()), None)).is_err());
}

#[test]
fn test_schema_too_new_maps_to_exit_code() {
    let err = fail_with(
        "Migration failed",
        &StoreError::SchemaTooNew {
            found: 20,
            supported: 13,
        },
    );
    assert_eq!(err.downcast_ref::<ExitCode>().unwrap().0, EXIT_SCHEMA_TOO_NEW);
}
