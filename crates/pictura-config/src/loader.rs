// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./pictura.toml` > `~/.config/pictura/pictura.toml` >
//! `/etc/pictura/pictura.toml`, with `PICTURA_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PicturaConfig;

/// System-wide configuration file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/pictura/pictura.toml";

/// Configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pictura.toml";

/// Per-user configuration file under the XDG config directory, if one exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pictura").join("pictura.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pictura/pictura.toml`
/// 3. `~/.config/pictura/pictura.toml`
/// 4. `./pictura.toml`
/// 5. `PICTURA_*` environment variables
pub fn load_config() -> Result<PicturaConfig, figment::Error> {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(PicturaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
        .extract()
}

/// Load configuration from an inline TOML string on top of defaults.
///
/// Environment variables are not consulted.
pub fn load_config_from_str(toml_content: &str) -> Result<PicturaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PicturaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file (the `--config` flag) with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PicturaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PicturaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `PICTURA_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `PICTURA_PAYMENT_WEBHOOK_SECRET` is `payment.webhook_secret`.
fn env_provider() -> Env {
    const SECTIONS: [&str; 7] = [
        "server",
        "storage",
        "credits",
        "payment",
        "generation",
        "auth",
        "prometheus",
    ];

    Env::prefixed("PICTURA_").map(|key| {
        let key = key.as_str().to_ascii_lowercase();
        SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or(key)
            .into()
    })
}
