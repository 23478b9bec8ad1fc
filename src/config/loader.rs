//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BuckitConfig;
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
pub fn parse_config(content: &str) -> Result<BuckitConfig, ConfigError> {
    let config: BuckitConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read and deserialize a TOML file without semantic validation.
///
/// Used on reload, where [`ConfigStore::install`](crate::config::ConfigStore::install)
/// is the validator.
pub fn read_config(path: &Path) -> Result<BuckitConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BuckitConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "port = 8181\n[[bindings]]\nhost_name = \"a.example.com\"\nbucket_name = \"abucket\"\nregion = \"us-east-1\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.port, 8181);
        assert_eq!(config.bindings[0].bucket_name, "abucket");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn syntax_error_is_parse_error() {
        assert!(matches!(parse_config("bindings = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn read_skips_semantic_checks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[bindings]]\nhost_name = \"a.example.com\"\nbucket_name = \"\"\nregion = \"us-east-1\""
        )
        .unwrap();

        let config = read_config(file.path()).unwrap();
        assert_eq!(config.bindings[0].bucket_name, "");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn semantic_error_is_validation_error() {
        let err = parse_config(
            "[[bindings]]\nhost_name = \"a.example.com\"\nbucket_name = \"\"\nregion = \"us-east-1\"",
        )
        .unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }
}
