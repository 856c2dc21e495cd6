use prefill_common::{ConfigError, PrefillConfig, load_config};
use std::io::Write;

use super::common::init_test_logging;

#[test]
fn test_default_config_matches_fixed_run() {
    init_test_logging();
    crate::test_log!("TEST START: test_default_config_matches_fixed_run");

    let config = PrefillConfig::default();
    assert_eq!(config.user_count, 100);
    assert_eq!(config.catalog.len(), 3);
    assert_eq!(config.friends_per_user, 3);
    assert_eq!(config.purchases_per_user, 2);
    assert!(!config.flush_on_start);
    assert!(!config.cancel_on_abort);
    assert_eq!(config.audience(), config.api_endpoint);

    crate::test_log!("TEST PASS: test_default_config_matches_fixed_run");
}

#[test]
fn test_config_file_overrides_defaults() {
    init_test_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_endpoint = "http://galaxy.test:5000"
user_count = 7
seed = 99

[[catalog]]
name = "Tiny"
app_url = "http://tiny.example"
icons = "64"
"#
    )
    .unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.api_endpoint, "http://galaxy.test:5000");
    assert_eq!(config.user_count, 7);
    assert_eq!(config.seed, Some(99));
    assert_eq!(config.catalog.len(), 1);
    assert_eq!(config.catalog[0].icons.as_deref(), Some("64"));
    assert_eq!(config.assertion_endpoint, "http://localhost:9001");
}

#[test]
fn test_invalid_config_is_rejected() {
    init_test_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_concurrency = 0").unwrap();

    let err = load_config(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }), "got {err:?}");
}

#[test]
fn test_oversized_concurrency_is_rejected_before_run() {
    init_test_logging();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "max_concurrency = 9223372036854775807").unwrap();

    let err = load_config(Some(file.path())).unwrap_err();
    assert!(
        matches!(err, ConfigError::Invalid { field: "max_concurrency", .. }),
        "got {err:?}"
    );
}
