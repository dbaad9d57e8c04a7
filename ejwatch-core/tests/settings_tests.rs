//! Settings loading, error-message, and terminal-table integration tests.

use assert_fs::prelude::*;
use ejwatch_core::{
    config::DEFAULT_LOG_FILE, ConfigError, IdentityResolver, RotationMode, Settings,
    StaticResolver, TerminalTable,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::time::Duration;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_settings_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("ejwatch.yaml");
    let err = Settings::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::SettingsNotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("ejwatch.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ejwatch.yaml");
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = Settings::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("ejwatch.yaml"));
}

#[rstest]
#[case("destination: /d\nterminal_id: T\n", "source")]
#[case("source: /s\nterminal_id: T\n", "destination")]
#[case("source: ''\ndestination: /d\nterminal_id: T\n", "source")]
fn missing_required_key_is_named(#[case] yaml: &str, #[case] key: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ejwatch.yaml");
    file.write_str(yaml).expect("write");

    let err = Settings::load_at(file.path()).unwrap_err();
    assert!(
        err.to_string().contains(key),
        "error should name '{key}', got: {err}"
    );
}

// ---------------------------------------------------------------------------
// 2. Full settings
// ---------------------------------------------------------------------------

#[test]
fn full_settings_resolve_against_settings_directory() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("ip_terminal_id.csv")
        .write_str("ip,terminal_id\n192.168.10.4,T42\n")
        .expect("write csv");
    let file = dir.child("ejwatch.yaml");
    file.write_str(
        "source: coreEJ/EJDATA.LOG\n\
         destination: CopyEJ\n\
         dump_directory: EJ_dump\n\
         terminal_table: ip_terminal_id.csv\n\
         tick_interval_secs: 10\n\
         rotation_mode: discard\n",
    )
    .expect("write settings");

    let settings = Settings::load_at(file.path()).expect("load");
    assert_eq!(settings.target.source_path, dir.path().join("coreEJ/EJDATA.LOG"));
    assert_eq!(settings.target.destination_directory, dir.path().join("CopyEJ"));
    assert_eq!(settings.target.dump_directory, dir.path().join("EJ_dump"));
    assert_eq!(settings.tick_interval, Duration::from_secs(10));
    assert_eq!(settings.rotation_mode, RotationMode::Discard);
    assert_eq!(settings.log_file, dir.path().join(DEFAULT_LOG_FILE));

    let table_path = settings.terminal_table.expect("table path");
    dir.child("ip_terminal_id.csv").assert(predicate::path::exists());
    let table = TerminalTable::load_at(&table_path).expect("load table");
    assert_eq!(table.len(), 1);
}

#[test]
fn static_terminal_id_resolves_without_table() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("ejwatch.yaml");
    file.write_str("source: /atm/EJDATA.LOG\ndestination: /copy\nterminal_id: T42\n")
        .expect("write");

    let settings = Settings::load_at(file.path()).expect("load");
    let resolver = StaticResolver(settings.terminal_id.expect("terminal id"));
    assert_eq!(resolver.resolve_terminal_id().unwrap().as_str(), "T42");
}
