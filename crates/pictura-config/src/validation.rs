// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All failures are
//! collected so the operator sees every problem in one run.

use crate::diagnostic::ConfigError;
use crate::model::PicturaConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &PicturaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        fail(format!(
            "server.log_level `{}` must be one of {}",
            config.server.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let credits = &config.credits;
    if credits.starting_grant < 0 {
        fail(format!(
            "credits.starting_grant must be non-negative, got {}",
            credits.starting_grant
        ));
    }
    if credits.credits_per_major_unit <= 0 {
        fail(format!(
            "credits.credits_per_major_unit must be positive, got {}",
            credits.credits_per_major_unit
        ));
    }
    if credits.minor_units_per_major_unit <= 0 {
        fail(format!(
            "credits.minor_units_per_major_unit must be positive, got {}",
            credits.minor_units_per_major_unit
        ));
    }
    if credits.cost_per_output <= 0 {
        fail(format!(
            "credits.cost_per_output must be positive, got {}",
            credits.cost_per_output
        ));
    }
    if credits.max_update_attempts == 0 {
        fail("credits.max_update_attempts must be at least 1".to_string());
    }

    let payment = &config.payment;
    if payment.packages.is_empty() {
        fail("payment.packages must list at least one package".to_string());
    }
    for package in payment.packages.iter().filter(|p| **p <= 0) {
        fail(format!(
            "payment.packages entries must be positive, got {package}"
        ));
    }
    if payment.currency.len() != 3 || !payment.currency.chars().all(|c| c.is_ascii_lowercase()) {
        fail(format!(
            "payment.currency `{}` must be a lowercase ISO 4217 code",
            payment.currency
        ));
    }
    for (key, url) in [
        ("payment.api_base_url", &payment.api_base_url),
        ("payment.success_url", &payment.success_url),
        ("payment.cancel_url", &payment.cancel_url),
        ("generation.base_url", &config.generation.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must be an http(s) URL"));
        }
    }

    let generation = &config.generation;
    if generation.model.split('/').filter(|s| !s.is_empty()).count() != 2 {
        fail(format!(
            "generation.model `{}` must have the form owner/name",
            generation.model
        ));
    }
    if generation.timeout_secs == 0 {
        fail("generation.timeout_secs must be at least 1".to_string());
    }
    if generation.poll_interval_ms == 0 {
        fail("generation.poll_interval_ms must be at least 1".to_string());
    }

    if config.auth.token_ttl_secs == 0 {
        fail("auth.token_ttl_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check the secrets `pictura serve` cannot start without.
///
/// Kept apart from [`validate_config`] so commands such as `account balance`
/// run without a webhook secret configured.
pub fn validate_for_serve(config: &PicturaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    if is_blank(config.payment.webhook_secret.as_deref()) {
        errors.push(ConfigError::MissingKey {
            key: "payment.webhook_secret".to_string(),
        });
    }
    if is_blank(config.auth.session_secret.as_deref()) {
        errors.push(ConfigError::MissingKey {
            key: "auth.session_secret".to_string(),
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
