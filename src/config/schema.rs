//! Configuration schema definitions.
//!
//! This module defines the configuration snapshot consumed by the server.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration: the bucket bindings, the listen port and the
/// shutdown timeout.
///
/// `bindings` and `shutdown_timeout` are hot-reloadable. `port` is only read
/// once, when the listener is bound.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BuckitConfig {
    /// Hostname to bucket rules, matched first to last.
    pub bindings: Vec<Binding>,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on graceful shutdown before connections are force-closed.
    #[serde(
        rename = "shutdown_timeout_secs",
        default = "default_shutdown_timeout",
        with = "duration_secs"
    )]
    pub shutdown_timeout: Duration,
}

impl Default for BuckitConfig {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            port: default_port(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// One hostname to bucket rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Binding {
    /// Host header value to match (exact, case-sensitive).
    pub host_name: String,

    /// Bucket to serve objects from.
    pub bucket_name: String,

    /// Bucket region.
    pub region: String,

    /// Optional access key; only used together with `secret_access_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Optional secret key; only used together with `access_key_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    /// Endpoint override for S3-compatible stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`).
    #[serde(default)]
    pub force_path_style: bool,
}

impl Binding {
    /// Create a binding that uses the default credential chain.
    pub fn new(
        host_name: impl Into<String>,
        bucket_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            bucket_name: bucket_name.into(),
            region: region.into(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            force_path_style: false,
        }
    }

    /// Static credentials for this binding, if both halves are configured.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

/// Serde adapter for a `Duration` written as (possibly fractional) seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Float(secs),
                &"a non-negative, finite number of seconds",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: BuckitConfig = toml::from_str(
            r#"
            port = 9000
            shutdown_timeout_secs = 2.5

            [[bindings]]
            host_name = "a.example.com"
            bucket_name = "abucket"
            region = "us-east-1"

            [[bindings]]
            host_name = "b.example.com"
            bucket_name = "bbucket"
            region = "eu-west-1"
            access_key_id = "AKIA"
            secret_access_key = "secret"
            endpoint_url = "http://localhost:9000"
            force_path_style = true
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(2500));
        assert_eq!(config.bindings.len(), 2);
        assert_eq!(config.bindings[0].host_name, "a.example.com");
        assert_eq!(config.bindings[0].static_credentials(), None);
        assert_eq!(config.bindings[1].static_credentials(), Some(("AKIA", "secret")));
        assert!(config.bindings[1].force_path_style);
    }

    #[test]
    fn integer_timeout_is_accepted() {
        let config: BuckitConfig =
            toml::from_str("bindings = []\nshutdown_timeout_secs = 5").unwrap();
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn bindings_field_is_required() {
        assert!(toml::from_str::<BuckitConfig>("port = 8080").is_err());
    }

    #[test]
    fn malformed_bindings_are_rejected() {
        assert!(toml::from_str::<BuckitConfig>("bindings = \"a.example.com\"").is_err());
        assert!(toml::from_str::<BuckitConfig>(
            "[[bindings]]\nhost_name = \"a.example.com\"\nregion = \"us-east-1\""
        )
        .is_err());
    }

    #[test]
    fn negative_timeout_is_rejected() {
        assert!(toml::from_str::<BuckitConfig>("bindings = []\nshutdown_timeout_secs = -1").is_err());
    }

    #[test]
    fn half_credentials_fall_back_to_default_chain() {
        let mut binding = Binding::new("a.example.com", "abucket", "us-east-1");
        binding.access_key_id = Some("AKIA".into());
        assert_eq!(binding.static_credentials(), None);
    }
}
