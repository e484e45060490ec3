//! Config 单元测试

use std::collections::HashMap;
use std::io::Write;

use crate::util::config::{
    load_config, load_config_or_default, ConfigError, RuntimeConfig, ENV_LOG, ENV_THREADS,
};
use crate::util::logger::LogLevel;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.pool.num_threads, None);
        assert_eq!(config.pool.thread_name, "promissory-worker");
        assert_eq!(config.pool.default_priority, 1);
        assert_eq!(config.log.level().unwrap(), LogLevel::Info);
        assert!(config.pool.resolved_threads() >= 1);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(RuntimeConfig::from_toml_str("").unwrap(), RuntimeConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let config = RuntimeConfig::from_toml_str(
            r#"
[pool]
num_threads = 3
thread_name = "loader"
stack_size = 1048576
default_priority = 2

[log]
level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.pool.resolved_threads(), 3);
        assert_eq!(config.pool.thread_name, "loader");
        assert_eq!(config.pool.stack_size, Some(1_048_576));
        assert_eq!(config.pool.default_priority, 2);
        assert_eq!(config.log.level().unwrap(), LogLevel::Debug);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str("[pool]\nnum_threads = 2\n").unwrap();
        assert_eq!(config.pool.thread_name, "promissory-worker");
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        let err = RuntimeConfig::from_toml_str("[pool\nnum_threads = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let err = RuntimeConfig::from_toml_str("[pool]\nnum_threads = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "pool.num_threads"));
    }

    #[test]
    fn test_bad_level_rejected() {
        let err = RuntimeConfig::from_toml_str("[log]\nlevel = \"chatty\"\n").unwrap_err();
        assert!(err.to_string().contains("chatty"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = RuntimeConfig::default();
        config.pool.num_threads = Some(6);
        config.log.level = "warn".to_string();
        let text = config.to_toml_string().unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }
}

#[cfg(test)]
mod override_tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(lookup_from(&[(ENV_THREADS, "5"), (ENV_LOG, "error")]))
            .unwrap();
        assert_eq!(config.pool.num_threads, Some(5));
        assert_eq!(config.log.level().unwrap(), LogLevel::Error);
    }

    #[test]
    fn test_no_overrides_keeps_values() {
        let mut config = RuntimeConfig::default();
        config.apply_overrides(lookup_from(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_bad_thread_override() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_THREADS, "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref value, .. } if value == "many"));
    }

    #[test]
    fn test_zero_threads_rejected_from_any_source() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_THREADS, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "pool.num_threads"));

        // Command-line override path: set the field, then validate.
        let mut config = RuntimeConfig::default();
        config.pool.num_threads = Some(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "pool.num_threads"));
    }
}

#[cfg(test)]
mod file_tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pool]\nnum_threads = 2\n\n[log]\nlevel = \"warn\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pool.num_threads, Some(2));
        assert_eq!(config.log.level().unwrap(), LogLevel::Warn);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config_or_default(Some(&path));
        // The process environment may carry overrides; without them this is the default.
        if std::env::var(ENV_THREADS).is_err() && std::env::var(ENV_LOG).is_err() {
            assert_eq!(config.unwrap(), RuntimeConfig::default());
        }
    }
}
