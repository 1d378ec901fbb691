use std::io::Write;

use claimgate::settings::{AppConfig, LogFormat};

#[test]
fn defaults_are_sane() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.limits.claims_per_hour, 10);
    assert_eq!(cfg.limits.checks_per_minute, 60);
    assert_eq!(cfg.slugs.min_length, 3);
    assert_eq!(cfg.slugs.max_length, 50);
    assert_eq!(cfg.slugs.verdict_ttl_secs, 30);
    assert_eq!(cfg.coordinator.deadline_ms, 2_000);
    assert_eq!(cfg.queue.name, "page_creation");
    assert_eq!(cfg.log_format, LogFormat::Text);
    cfg.validate().expect("defaults validate");
}

#[test]
fn toml_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(
        file,
        r#"
log_format = "json"

[limits]
claims_per_hour = 3

[slugs]
min_length = 5
verdict_ttl_secs = 10

[coordinator]
deadline_ms = 500

[queue]
name = "claims"
"#
    )
    .expect("write config");

    let cfg = AppConfig::load(Some(file.path())).expect("load");
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert_eq!(cfg.limits.claims_per_hour, 3);
    // Unset fields keep their defaults.
    assert_eq!(cfg.limits.checks_per_minute, 60);
    assert_eq!(cfg.slugs.min_length, 5);
    assert_eq!(cfg.slugs.max_length, 50);
    assert_eq!(cfg.slugs.verdict_ttl_secs, 10);
    assert_eq!(cfg.coordinator.deadline_ms, 500);
    assert_eq!(cfg.queue.name, "claims");
}

#[test]
fn inverted_length_bounds_are_rejected() {
    let mut cfg = AppConfig::default();
    cfg.slugs.min_length = 60;
    assert!(cfg.validate().is_err());
}

#[test]
fn zero_limits_are_rejected() {
    let mut cfg = AppConfig::default();
    cfg.limits.claims_per_hour = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn zero_deadline_is_rejected() {
    let mut cfg = AppConfig::default();
    cfg.coordinator.deadline_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn unparseable_config_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    write!(file, "limits = \"not a table\"").expect("write config");
    assert!(AppConfig::load(Some(file.path())).is_err());
}
