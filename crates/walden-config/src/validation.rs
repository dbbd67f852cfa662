// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as paired memory-map bounds and ordered checkpoint delays.

use crate::diagnostic::ConfigError;
use crate::model::WaldenConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WaldenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    match (config.engine.mmap_default_size, config.engine.mmap_max_size) {
        (Some(default), Some(max)) => {
            if default < 0 || max < 0 {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "engine.mmap_default_size and engine.mmap_max_size must be non-negative, got {default} and {max}"
                    ),
                });
            } else if default > max {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "engine.mmap_default_size ({default}) must not exceed engine.mmap_max_size ({max})"
                    ),
                });
            }
        }
        (None, None) => {}
        _ => errors.push(ConfigError::Validation {
            message: "engine.mmap_default_size and engine.mmap_max_size must be set together"
                .to_string(),
        }),
    }

    let prefix = &config.connection.savepoint_prefix;
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        || prefix.starts_with(|c: char| c.is_ascii_digit())
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "connection.savepoint_prefix `{prefix}` must be a non-empty identifier of letters, digits, and underscores"
            ),
        });
    }

    let checkpoint = &config.checkpoint;
    if checkpoint.frames_threshold_for_critical == 0 {
        errors.push(ConfigError::Validation {
            message: "checkpoint.frames_threshold_for_critical must be at least 1".to_string(),
        });
    }

    let critical = checkpoint.delay_for_critical_secs;
    let non_critical = checkpoint.delay_for_non_critical_secs;
    if !critical.is_finite() || critical < 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "checkpoint.delay_for_critical_secs must be a non-negative number, got {critical}"
            ),
        });
    }
    if !non_critical.is_finite() || non_critical <= 0.0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "checkpoint.delay_for_non_critical_secs must be a positive number, got {non_critical}"
            ),
        });
    }
    if critical.is_finite() && non_critical.is_finite() && critical > non_critical {
        errors.push(ConfigError::Validation {
            message: format!(
                "checkpoint.delay_for_critical_secs ({critical}) must not exceed checkpoint.delay_for_non_critical_secs ({non_critical})"
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
