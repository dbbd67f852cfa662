// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Walden configuration system.

use walden_config::diagnostic::ConfigError;
use walden_config::model::WaldenConfig;
use walden_config::{load_and_validate_str, load_config_from_str};
use walden_core::{CheckpointMode, SynchronousMode};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_walden_config() {
    let toml = r#"
[log]
level = "debug"

[engine]
multithread = false
mmap_default_size = 1048576
mmap_max_size = 2097152
memory_status = false
forward_log = false

[connection]
wal_mode = true
synchronous = "full"
savepoint_prefix = "app_sp_"

[checkpoint]
enabled = true
mode = "truncate"
frames_threshold_for_critical = 250
delay_for_critical_secs = 0.5
delay_for_non_critical_secs = 30.0
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert!(!config.engine.multithread);
    assert_eq!(config.engine.mmap_default_size, Some(1_048_576));
    assert_eq!(config.engine.mmap_max_size, Some(2_097_152));
    assert_eq!(config.engine.memory_status, Some(false));
    assert!(!config.engine.forward_log);
    assert_eq!(config.connection.synchronous, SynchronousMode::Full);
    assert_eq!(config.connection.savepoint_prefix, "app_sp_");
    assert_eq!(config.checkpoint.mode, CheckpointMode::Truncate);
    assert_eq!(config.checkpoint.frames_threshold_for_critical, 250);
    assert_eq!(config.checkpoint.delay_for_critical_secs, 0.5);
    assert_eq!(config.checkpoint.delay_for_non_critical_secs, 30.0);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.log.level, "info");
    assert!(config.engine.multithread);
    assert!(config.engine.mmap_default_size.is_none());
    assert!(config.engine.forward_log);
    assert!(config.connection.wal_mode);
    assert_eq!(config.connection.synchronous, SynchronousMode::Normal);
    assert_eq!(config.connection.savepoint_prefix, "walden_savepoint_");
    assert!(config.checkpoint.enabled);
    assert_eq!(config.checkpoint.mode, CheckpointMode::Passive);
    assert_eq!(config.checkpoint.frames_threshold_for_critical, 100);
    assert_eq!(config.checkpoint.delay_for_critical_secs, 1.0);
    assert_eq!(config.checkpoint.delay_for_non_critical_secs, 10.0);
}

/// Unknown field in [checkpoint] is rejected.
#[test]
fn unknown_field_in_checkpoint_produces_error() {
    let toml = r#"
[checkpoint]
mdoe = "full"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("mdoe"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[storage]
database_path = "x.db"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// A nested override layered on top of TOML wins, as env vars do.
#[test]
fn later_layer_overrides_checkpoint_threshold() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[checkpoint]
frames_threshold_for_critical = 50
"#;

    let config: WaldenConfig = Figment::new()
        .merge(Serialized::defaults(WaldenConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("checkpoint.frames_threshold_for_critical", 500))
        .extract()
        .expect("should merge override");

    assert_eq!(config.checkpoint.frames_threshold_for_critical, 500);
}

/// Typos in section keys surface as UnknownKey diagnostics with a suggestion.
#[test]
fn diagnostic_mdoe_suggests_mode() {
    let toml = r#"
[checkpoint]
mdoe = "full"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    let unknown = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey {
                key, suggestion, ..
            } => Some((key.clone(), suggestion.clone())),
            _ => None,
        })
        .expect("should produce UnknownKey");
    assert_eq!(unknown.0, "mdoe");
    assert_eq!(unknown.1.as_deref(), Some("mode"));
}

/// Unknown key diagnostics list the valid keys of the section.
#[test]
fn diagnostic_error_includes_valid_keys() {
    let toml = r#"
[connection]
wal = true
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    let valid_keys = errors
        .iter()
        .find_map(|e| match e {
            ConfigError::UnknownKey { valid_keys, .. } => Some(valid_keys.clone()),
            _ => None,
        })
        .expect("should produce UnknownKey");
    assert!(valid_keys.contains("wal_mode"));
    assert!(valid_keys.contains("savepoint_prefix"));
}

/// Wrong value types surface as InvalidType diagnostics.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[checkpoint]
frames_threshold_for_critical = "many"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("frames_threshold_for_critical"))));
}

/// Diagnostics render through miette without panicking.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let errors = load_and_validate_str("[engine]\nmultithred = true\n").expect_err("should fail");
    let handler = GraphicalReportHandler::new();
    for error in &errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        handler
            .render_report(&mut buf, diagnostic)
            .expect("should render");
        assert!(buf.contains("multithred"));
    }
}

/// Semantic validation runs after a successful parse.
#[test]
fn load_and_validate_rejects_inverted_delays() {
    let toml = r#"
[checkpoint]
delay_for_critical_secs = 20.0
delay_for_non_critical_secs = 5.0
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn load_and_validate_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.log.level, "info");
}
