//! Client configuration
//!
//! Layered lowest to highest: defaults, TOML file, environment, then
//! whatever the caller applies on top (command-line flags).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding `base_url`
pub const ENV_BASE_URL: &str = "MDM_API_BASE_URL";
/// Environment variable overriding `policy_id`
pub const ENV_POLICY_ID: &str = "MDM_POLICY_ID";
/// Environment variable overriding `session_file`
pub const ENV_SESSION_FILE: &str = "MDM_SESSION_FILE";

/// Connection and session settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// Policy edited by the policy views
    pub policy_id: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Where the session token is persisted
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With API root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With policy id
    #[inline]
    #[must_use]
    pub fn with_policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = policy_id.into();
        self
    }

    /// With request timeout
    #[inline]
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// With session file location
    #[inline]
    #[must_use]
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = path.into();
        self
    }

    /// Request timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this shape
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup; blank values are ignored
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = get(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(id) = get(ENV_POLICY_ID) {
            self.policy_id = id;
        }
        if let Some(file) = get(ENV_SESSION_FILE) {
            self.session_file = PathBuf::from(file);
        }
        self
    }

    /// Defaults, then `file` if given, then the environment
    ///
    /// # Errors
    /// Returns error if the file cannot be loaded
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env())
    }

    /// Check invariants and normalize the base URL
    ///
    /// # Errors
    /// - `ConfigError::InvalidBaseUrl` unless the URL is absolute http(s)
    /// - `ConfigError::EmptyPolicyId` for a blank policy id
    /// - `ConfigError::ZeroTimeout` for a zero timeout
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        let host = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"));
        if host.map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url));
        }
        self.base_url = trimmed.to_string();

        if self.policy_id.trim().is_empty() {
            return Err(ConfigError::EmptyPolicyId);
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8085/api".to_string(),
            policy_id: "policy1".to_string(),
            timeout_secs: 30,
            session_file: default_session_file(),
        }
    }
}

fn default_session_file() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".mdm-console").join("session.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url, "http://localhost:8085/api");
        assert_eq!(config.policy_id, "policy1");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.session_file.ends_with(".mdm-console/session.json"));
    }

    #[test]
    fn toml_keeps_missing_keys_default() {
        let config = ClientConfig::from_toml_str("base_url = \"https://mdm.example.com/api\"\n").unwrap();
        assert_eq!(config.base_url, "https://mdm.example.com/api");
        assert_eq!(config.policy_id, "policy1");
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let err = ClientConfig::from_toml_str("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            (ENV_BASE_URL, "https://env.example.com/api/"),
            (ENV_POLICY_ID, "  "),
            (ENV_SESSION_FILE, "/tmp/s.json"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::new()
            .with_policy_id("kiosk")
            .with_env_from(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.base_url, "https://env.example.com/api/");
        assert_eq!(config.policy_id, "kiosk");
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
    }

    #[test]
    fn validate_trims_trailing_slash() {
        let config = ClientConfig::new()
            .with_base_url("https://mdm.example.com/api//")
            .validate()
            .unwrap();
        assert_eq!(config.base_url, "https://mdm.example.com/api");
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(matches!(
            ClientConfig::new().with_base_url("localhost:8085").validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ClientConfig::new().with_base_url("https://").validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ClientConfig::new().with_policy_id("").validate(),
            Err(ConfigError::EmptyPolicyId)
        ));
        assert!(matches!(
            ClientConfig::new().with_timeout_secs(0).validate(),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "policy_id = \"kiosk\"\ntimeout_secs = 5\n").unwrap();
        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.policy_id, "kiosk");
        assert_eq!(config.timeout_secs, 5);

        let missing = ClientConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
