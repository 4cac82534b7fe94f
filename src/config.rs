//! Configuration management for cloudns-sync.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ClouDNS API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.cloudns.net";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ClouDNS API credentials.
    pub credentials: Credentials,

    /// The record being managed.
    pub target: Target,

    /// API endpoint settings.
    #[serde(default)]
    pub api: ApiSettings,
}

/// ClouDNS API credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// auth-id (or environment variable name if prefixed with $).
    pub auth_id: String,
    /// auth-password (or environment variable name if prefixed with $).
    pub auth_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_id", &self.auth_id)
            .field("auth_password", &"<redacted>")
            .finish()
    }
}

/// Domain and host label identifying the managed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    /// Zone name (e.g., "example.com").
    pub domain_name: String,
    /// Host label within the zone (e.g., "vpn").
    pub host: String,
}

impl Target {
    /// Fully qualified name of the record.
    pub fn fqdn(&self) -> String {
        if self.host.is_empty() || self.host == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.host, self.domain_name)
        }
    }
}

/// API endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// API base URL (default: https://api.cloudns.net).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (default: 60).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// TTL sent with record updates (default: 60).
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_ttl() -> u32 {
    60
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            ttl: default_ttl(),
        }
    }
}

impl ApiSettings {
    /// Upper bound for each outbound request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SyncError::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("cloudns-sync").join("config.toml"))
    }

    /// Load configuration from `path`, or from the environment when no
    /// config file was found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                tracing::debug!("No config file found, reading configuration from environment");
                Self::from_env()
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config.resolved())
    }

    /// Build configuration from `CLOUDNS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                SyncError::Config(format!("no config file found and {} is not set", key))
            })
        };
        let parsed = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map_err(|_| SyncError::Config(format!("{} must be a number, got '{}'", key, v)))
                })
                .transpose()
        };

        let ttl = match parsed("CLOUDNS_TTL")? {
            Some(ttl) => u32::try_from(ttl)
                .map_err(|_| SyncError::Config(format!("CLOUDNS_TTL out of range: {}", ttl)))?,
            None => default_ttl(),
        };

        Ok(Self {
            credentials: Credentials {
                auth_id: required("CLOUDNS_AUTH_ID")?,
                auth_password: required("CLOUDNS_AUTH_PASSWORD")?,
            },
            target: Target {
                domain_name: required("CLOUDNS_DOMAIN_NAME")?,
                host: required("CLOUDNS_HOST")?,
            },
            api: ApiSettings {
                base_url: lookup("CLOUDNS_API_URL").unwrap_or_else(default_base_url),
                timeout_secs: parsed("CLOUDNS_TIMEOUT_SECS")?.unwrap_or_else(default_timeout),
                ttl,
            },
        })
    }

    /// Replace `$VAR` references with their environment values.
    fn resolved(mut self) -> Self {
        self.credentials.auth_id = resolve_env(&self.credentials.auth_id);
        self.credentials.auth_password = resolve_env(&self.credentials.auth_password);
        self.target.domain_name = resolve_env(&self.target.domain_name);
        self.target.host = resolve_env(&self.target.host);
        self
    }

    /// Check that every value needed for a run is present.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("credentials.auth_id", &self.credentials.auth_id),
            ("credentials.auth_password", &self.credentials.auth_password),
            ("target.domain_name", &self.target.domain_name),
            ("api.base_url", &self.api.base_url),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{} is empty", name)));
            }
            if value.starts_with('$') {
                return Err(SyncError::Config(format!(
                    "{} refers to unset environment variable {}",
                    name, value
                )));
            }
        }

        // host may be empty for the zone apex
        if self.target.host.starts_with('$') {
            return Err(SyncError::Config(format!(
                "target.host refers to unset environment variable {}",
                self.target.host
            )));
        }

        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            SyncError::Config(format!("api.base_url '{}' is invalid: {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyncError::Config(format!(
                "api.base_url must be an http(s) URL, got '{}'",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(SyncError::Config("api.timeout_secs must be positive".to_string()));
        }
        if self.api.ttl == 0 {
            return Err(SyncError::Config("api.ttl must be positive".to_string()));
        }

        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate example configuration.
    pub fn example() -> Self {
        Self {
            credentials: Credentials {
                auth_id: "$CLOUDNS_AUTH_ID".to_string(),
                auth_password: "$CLOUDNS_AUTH_PASSWORD".to_string(),
            },
            target: Target {
                domain_name: "example.com".to_string(),
                host: "vpn".to_string(),
            },
            api: ApiSettings::default(),
        }
    }
}

/// Resolve environment variable references (values starting with $).
pub(crate) fn resolve_env(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_else(|_| {
            tracing::warn!("Environment variable {} not set", var_name);
            value.to_string()
        })
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_parse_config_with_defaults() {
        let toml_str = r#"
[credentials]
auth_id = "1234"
auth_password = "secret"

[target]
domain_name = "example.com"
host = "vpn"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.credentials.auth_id, "1234");
        assert_eq!(config.target.host, "vpn");
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout(), Duration::from_secs(60));
        assert_eq!(config.api.ttl, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_overrides() {
        let toml_str = r#"
[credentials]
auth_id = "1234"
auth_password = "secret"

[target]
domain_name = "example.com"
host = "@"

[api]
base_url = "http://localhost:8080"
timeout_secs = 5
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.ttl, 60);
        assert_eq!(config.target.fqdn(), "example.com");
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let toml_str = r#"
[credentials]
auth_id = "1234"
auth_password = "secret"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut config = Config::example();
        config.credentials.auth_id = "1234".to_string();
        config.credentials.auth_password = "secret".to_string();
        assert!(config.validate().is_ok());

        config.target.host = String::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.target.fqdn(), "example.com");

        config.target.domain_name = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target.domain_name"));
    }

    #[test]
    fn test_validate_rejects_unresolved_variables() {
        let config = Config::example();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("$CLOUDNS_AUTH_ID"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_ttl() {
        let mut config = Config::example();
        config.credentials.auth_id = "1234".to_string();
        config.credentials.auth_password = "secret".to_string();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.api.timeout_secs = 60;
        config.api.ttl = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::example();
        config.credentials.auth_id = "1234".to_string();
        config.credentials.auth_password = "secret".to_string();

        config.api.base_url = "api.cloudns.net".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("api.base_url"));

        config.api.base_url = "ftp://api.cloudns.net".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "http://127.0.0.1:8080/".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("cloudns-sync-no-such-dir/config.toml");
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("CLOUDNS_AUTH_ID", "42"),
            ("CLOUDNS_AUTH_PASSWORD", "pw"),
            ("CLOUDNS_DOMAIN_NAME", "example.org"),
            ("CLOUDNS_HOST", "home"),
            ("CLOUDNS_TTL", "300"),
        ]))
        .unwrap();

        assert_eq!(config.credentials.auth_id, "42");
        assert_eq!(config.target.fqdn(), "home.example.org");
        assert_eq!(config.api.ttl, 300);
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let err = Config::from_lookup(lookup_from(&[("CLOUDNS_AUTH_ID", "42")])).unwrap_err();
        assert!(err.to_string().contains("CLOUDNS_AUTH_PASSWORD"));
    }

    #[test]
    fn test_from_lookup_bad_number() {
        let err = Config::from_lookup(lookup_from(&[
            ("CLOUDNS_AUTH_ID", "42"),
            ("CLOUDNS_AUTH_PASSWORD", "pw"),
            ("CLOUDNS_DOMAIN_NAME", "example.org"),
            ("CLOUDNS_HOST", "home"),
            ("CLOUDNS_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            auth_id: "1234".to_string(),
            auth_password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(debug.contains("1234"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_example_roundtrips_through_toml() {
        let rendered = Config::example().to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.target.host, "vpn");
        assert_eq!(parsed.api.ttl, 60);
    }

    #[test]
    fn test_resolve_env_with_value() {
        assert_eq!(resolve_env("plain_value"), "plain_value");
    }

    #[test]
    fn test_resolve_env_with_existing_var() {
        std::env::set_var("TEST_CLOUDNS_SYNC_VAR", "resolved_value");
        assert_eq!(resolve_env("$TEST_CLOUDNS_SYNC_VAR"), "resolved_value");
        std::env::remove_var("TEST_CLOUDNS_SYNC_VAR");
    }

    #[test]
    fn test_resolve_env_with_missing_var() {
        let result = resolve_env("$NONEXISTENT_VAR_12345");
        assert_eq!(result, "$NONEXISTENT_VAR_12345");
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("cloudns-sync-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            r#"
[credentials]
auth_id = "1234"
auth_password = "secret"

[target]
domain_name = "example.com"
host = "vpn"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.target.fqdn(), "vpn.example.com");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
