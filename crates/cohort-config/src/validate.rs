//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `registry.max_binding_iterations`.
const MAX_BINDING_ITERATIONS_UPPER_BOUND: usize = 1_000_000;
/// Upper bound for `registry.event_capacity`.
const EVENT_CAPACITY_UPPER_BOUND: usize = 1 << 20;

const VALID_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];
const VALID_TARGETS: &[&str] = &["stdout", "stderr"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_registry(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_registry(config: &Config) -> ConfigResult<()> {
    let r = &config.registry;

    if r.max_binding_iterations == 0 || r.max_binding_iterations > MAX_BINDING_ITERATIONS_UPPER_BOUND
    {
        return Err(ConfigError::ValidationError {
            field: "registry.max_binding_iterations".to_owned(),
            message: format!(
                "max_binding_iterations must be between 1 and {MAX_BINDING_ITERATIONS_UPPER_BOUND}"
            ),
        });
    }

    if r.event_capacity == 0 || r.event_capacity > EVENT_CAPACITY_UPPER_BOUND {
        return Err(ConfigError::ValidationError {
            field: "registry.event_capacity".to_owned(),
            message: format!("event_capacity must be between 1 and {EVENT_CAPACITY_UPPER_BOUND}"),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    one_of("logging.level", &l.level, VALID_LEVELS)?;
    one_of("logging.format", &l.format, VALID_FORMATS)?;
    one_of("logging.target", &l.target, VALID_TARGETS)?;

    if let Some(index) = l.directives.iter().position(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("logging.directives[{index}]"),
            message: "directive must not be empty".to_owned(),
        });
    }

    Ok(())
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        field: field.to_owned(),
        message: format!(
            "unsupported value '{value}'; expected one of: {}",
            allowed.join(", ")
        ),
    })
}
