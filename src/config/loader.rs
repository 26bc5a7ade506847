//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::SluiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<SluiceConfig, ConfigError> {
    let config: SluiceConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SluiceConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config = parse_config(&content)?;

    tracing::debug!(
        path = %path.display(),
        mode = ?config.timeouts.mode,
        connect_secs = config.timeouts.connect_secs,
        read_secs = config.timeouts.read_secs,
        write_secs = config.timeouts.write_secs,
        "Configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.timeouts.read(), Duration::from_millis(250));
    }

    #[test]
    fn oversized_timeout_is_rejected_before_use() {
        match parse_config("[timeouts]\nread_secs = 1e30\n").unwrap_err() {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "timeouts.read_secs"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("[timeouts]\nread_secs = -1.0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "timeouts.read_secs");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            parse_config("[timeouts\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/sluice.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
