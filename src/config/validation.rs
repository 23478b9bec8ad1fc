//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value shapes (non-empty names, parseable endpoints)
//! - Detect ambiguous bindings (duplicate host names)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BuckitConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the store
//! - Duplicate host names are warnings only; resolution stays first-match

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::BuckitConfig;

/// A rule violation that makes a configuration unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("binding #{index}: host_name must not be empty")]
    EmptyHostName { index: usize },

    #[error("binding #{index} ({host}): bucket_name must not be empty")]
    EmptyBucketName { index: usize, host: String },

    #[error("binding #{index} ({host}): region must not be empty")]
    EmptyRegion { index: usize, host: String },

    #[error("binding #{index} ({host}): invalid endpoint_url {url:?}: {reason}")]
    InvalidEndpoint {
        index: usize,
        host: String,
        url: String,
        reason: String,
    },
}

/// Something suspicious that does not prevent the configuration from loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A later binding repeats an earlier host name and can never match.
    DuplicateHostName { index: usize, host: String },
    /// Only one of the two credential fields is set; the default chain is used.
    PartialCredentials { index: usize, host: String },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::DuplicateHostName { index, host } => write!(
                f,
                "binding #{} repeats host {:?} and is shadowed by an earlier binding",
                index, host
            ),
            ValidationWarning::PartialCredentials { index, host } => write!(
                f,
                "binding #{} ({}) sets only one of access_key_id/secret_access_key; using default credentials",
                index, host
            ),
        }
    }
}

/// Check a configuration, returning every violation found.
pub fn validate_config(config: &BuckitConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, binding) in config.bindings.iter().enumerate() {
        let host = binding.host_name.clone();
        if binding.host_name.is_empty() {
            errors.push(ValidationError::EmptyHostName { index });
        }
        if binding.bucket_name.is_empty() {
            errors.push(ValidationError::EmptyBucketName {
                index,
                host: host.clone(),
            });
        }
        if binding.region.is_empty() {
            errors.push(ValidationError::EmptyRegion {
                index,
                host: host.clone(),
            });
        }
        if let Some(endpoint) = &binding.endpoint_url {
            if let Err(e) = url::Url::parse(endpoint) {
                errors.push(ValidationError::InvalidEndpoint {
                    index,
                    host,
                    url: endpoint.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collect non-fatal findings about a configuration.
pub fn config_warnings(config: &BuckitConfig) -> Vec<ValidationWarning> {
    let mut seen = HashSet::new();
    let mut warnings = Vec::new();

    for (index, binding) in config.bindings.iter().enumerate() {
        if !seen.insert(binding.host_name.as_str()) {
            warnings.push(ValidationWarning::DuplicateHostName {
                index,
                host: binding.host_name.clone(),
            });
        }
        if binding.access_key_id.is_some() != binding.secret_access_key.is_some() {
            warnings.push(ValidationWarning::PartialCredentials {
                index,
                host: binding.host_name.clone(),
            });
        }
    }

    warnings
}

/// Log every warning for a configuration.
pub fn log_warnings(config: &BuckitConfig) {
    for warning in config_warnings(config) {
        tracing::warn!("{}", warning);
    }
}
