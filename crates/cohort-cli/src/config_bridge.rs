//! Bridge from `cohort_config::Config` to the runtime's settings types.

use cohort_config::Config;
use cohort_registry::RegistrySettings;
use cohort_telemetry::{LogConfig, LogFormat, LogTarget};

/// Convert the logging section to a [`LogConfig`].
///
/// Unknown format or target names fall back to compact output on stderr;
/// validated configs never contain them.
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = cfg.logging.format.parse().unwrap_or(LogFormat::Compact);
    let target = cfg.logging.target.parse().unwrap_or(LogTarget::Stderr);

    let mut log_config = LogConfig::new(&cfg.logging.level)
        .with_format(format)
        .with_target(target);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }
    if !cfg.logging.ansi {
        log_config = log_config.without_ansi();
    }
    if cfg.logging.file_info {
        log_config = log_config.with_file_info();
    }

    log_config
}

/// Convert the registry section to [`RegistrySettings`].
pub fn to_registry_settings(cfg: &Config) -> RegistrySettings {
    RegistrySettings {
        max_binding_iterations: cfg.registry.max_binding_iterations,
        catch_callback_panics: cfg.registry.catch_callback_panics,
        event_capacity: cfg.registry.event_capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_log_config() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.target = "stdout".to_owned();
        cfg.logging.directives = vec!["cohort_registry=trace".to_owned()];
        cfg.logging.ansi = false;

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.target, LogTarget::Stdout);
        assert_eq!(log.directives, vec!["cohort_registry=trace"]);
        assert!(!log.ansi);
        assert!(!log.file_info);
    }

    #[test]
    fn test_to_registry_settings() {
        let mut cfg = Config::default();
        cfg.registry.max_binding_iterations = 12;
        cfg.registry.catch_callback_panics = false;

        let settings = to_registry_settings(&cfg);
        assert_eq!(settings.max_binding_iterations, 12);
        assert!(!settings.catch_callback_panics);
        assert_eq!(settings.event_capacity, 1024);
    }

    #[test]
    fn test_defaults_line_up() {
        assert_eq!(
            to_registry_settings(&Config::default()),
            RegistrySettings::default()
        );
    }
}
