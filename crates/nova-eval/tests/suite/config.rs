use nova_eval::{ConfigError, EvalConfig, LoggingConfig};

#[test]
fn config_is_loaded_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eval.toml");
    std::fs::write(
        &path,
        r#"
timeout_ms = 1500

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = EvalConfig::load_from_path(&path).unwrap();
    assert_eq!(config.timeout_ms, Some(1500));
    assert_eq!(config.max_operand_stack, 1024);
    assert_eq!(
        config.logging,
        LoggingConfig {
            level: "debug".into(),
            json: false,
        }
    );
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let err = EvalConfig::load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => assert!(reported.ends_with("missing.toml")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn logging_initializes_once() {
    let config = LoggingConfig::default();
    let _ = nova_eval::logging::init(&config);
    assert!(!nova_eval::logging::init(&config));
}
