//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::IntercomConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<IntercomConfig, ConfigError> {
    let config: IntercomConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<IntercomConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [listener]
            host = "172.16.1.160"
            port = 5001

            [reply]
            attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.host, "172.16.1.160");
        assert_eq!(config.listener.port, 5001);
        assert_eq!(config.listener.max_clients, 10);
        assert_eq!(config.reply.attempts, 5);
        assert_eq!(config.reply.read_timeout_ms, 1000);
        assert_eq!(config.audio.chunk_size, 512);
        assert_eq!(config.keepalive.idle_secs, 30);
        assert_eq!(config.keepalive.interval_secs, 5);
        assert_eq!(config.keepalive.probe_count, 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("[timeouts]\nread_ms = 0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::NotPositive { field: "timeouts.read_ms" }]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(parse_config("[listener\nport = 1"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
