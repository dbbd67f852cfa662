// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./walden.toml` > `~/.config/walden/walden.toml` > `/etc/walden/walden.toml`
//! with environment variable overrides via `WALDEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use tracing::debug;

use crate::model::WaldenConfig;

const SYSTEM_CONFIG: &str = "/etc/walden/walden.toml";
const LOCAL_CONFIG: &str = "walden.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/walden/walden.toml` (system-wide)
/// 3. `~/.config/walden/walden.toml` (user XDG config)
/// 4. `./walden.toml` (local directory)
/// 5. `WALDEN_*` environment variables
pub fn load_config() -> Result<WaldenConfig, figment::Error> {
    debug!(files = ?existing_config_files(), "configuration files found");
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<WaldenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaldenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WaldenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WaldenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The layered figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WaldenConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// `$XDG_CONFIG_HOME/walden/walden.toml`, when a config directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("walden").join(LOCAL_CONFIG))
}

const SECTIONS: &[&str] = &["log", "engine", "connection", "checkpoint"];

/// `WALDEN_*` variables, mapped as `<SECTION>_<FIELD>` to `section.field`.
///
/// Field names contain underscores themselves, so only the leading section
/// name is split off: `WALDEN_CHECKPOINT_DELAY_FOR_CRITICAL_SECS` becomes
/// `checkpoint.delay_for_critical_secs`.
fn env_provider() -> Env {
    Env::prefixed("WALDEN_").map(|key| {
        let key = key.as_str();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}

/// Config files on disk, lowest precedence first.
fn existing_config_files() -> Vec<PathBuf> {
    let local = std::env::current_dir()
        .map(|dir| dir.join(LOCAL_CONFIG))
        .unwrap_or_else(|_| LOCAL_CONFIG.into());
    [Some(PathBuf::from(SYSTEM_CONFIG)), user_config_path(), Some(local)]
        .into_iter()
        .flatten()
        .filter(|path| path.is_file())
        .collect()
}

/// Every config file that exists, as `(display path, contents)`, lowest
/// precedence first. Used to attach source spans to diagnostics.
pub fn config_sources() -> Vec<(String, String)> {
    existing_config_files()
        .into_iter()
        .filter_map(|path| {
            let contents = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), contents))
        })
        .collect()
}
