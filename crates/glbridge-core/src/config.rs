//! Configuration management for glbridge.
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables. The config file lives in a platform-specific location:
//!
//! - **macOS/Linux**: `~/.config/glbridge/config.toml`
//! - **Windows**: `%APPDATA%\glbridge\config.toml`
//!
//! # Example
//!
//! ```toml
//! [gitlab]
//! url = "https://gitlab.example.com"
//! token_env = "GITLAB_TOKEN"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "glbridge";

/// Environment variable that overrides the GitLab URL.
pub const URL_ENV: &str = "GITLAB_URL";

/// Default environment variable holding the personal access token.
pub const DEFAULT_TOKEN_ENV: &str = "GITLAB_TOKEN";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitLab configuration
    #[serde(default)]
    pub gitlab: GitLabConfig,
}

/// GitLab connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// GitLab instance URL
    #[serde(default = "default_gitlab_url")]
    pub url: String,
    /// Name of the environment variable that holds the access token
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: default_gitlab_url(),
            token_env: default_token_env(),
        }
    }
}

fn default_gitlab_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Fully resolved connection settings.
#[derive(Clone)]
pub struct Credentials {
    /// GitLab instance URL
    pub url: String,
    /// Personal access token
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Resolve URL and token from the process environment.
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_from(|key| std::env::var(key).ok())
    }

    /// Resolve URL and token using `lookup` for environment access.
    pub fn credentials_from<F>(&self, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_ENV)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.gitlab.url.clone());

        let token = lookup(&self.gitlab.token_env)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "GitLab token not found: set the {} environment variable",
                    self.gitlab.token_env
                ))
            })?;

        Ok(Credentials {
            url: url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gitlab.url, "https://gitlab.com");
        assert_eq!(config.gitlab.token_env, "GITLAB_TOKEN");
    }

    #[test]
    fn test_load_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.gitlab.url, "https://gitlab.com");
    }

    #[test]
    fn test_load_from_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "[gitlab]\nurl = \"https://gitlab.example.com\"\ntoken_env = \"MY_TOKEN\"\n",
        )
        .unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();
        assert_eq!(config.gitlab.url, "https://gitlab.example.com");
        assert_eq!(config.gitlab.token_env, "MY_TOKEN");
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[gitlab]\nurl = \"https://git.local/\"\n").unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();
        assert_eq!(config.gitlab.token_env, "GITLAB_TOKEN");
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[gitlab\nurl=").unwrap();

        let result = Config::load_from(temp_file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_credentials_from_env() {
        let config = Config::default();
        let creds = config
            .credentials_from(env(&[("GITLAB_TOKEN", "glpat-123")]))
            .unwrap();
        assert_eq!(creds.url, "https://gitlab.com");
        assert_eq!(creds.token, "glpat-123");
    }

    #[test]
    fn test_credentials_url_override() {
        let config = Config::default();
        let creds = config
            .credentials_from(env(&[
                ("GITLAB_TOKEN", "t"),
                ("GITLAB_URL", "https://git.example.org/"),
            ]))
            .unwrap();
        assert_eq!(creds.url, "https://git.example.org");
    }

    #[test]
    fn test_credentials_custom_token_env() {
        let mut config = Config::default();
        config.gitlab.token_env = "WORK_TOKEN".to_string();

        assert!(config
            .credentials_from(env(&[("GITLAB_TOKEN", "t")]))
            .is_err());
        let creds = config
            .credentials_from(env(&[("WORK_TOKEN", "w")]))
            .unwrap();
        assert_eq!(creds.token, "w");
    }

    #[test]
    fn test_missing_token() {
        let config = Config::default();
        let err = config.credentials_from(env(&[])).unwrap_err();
        assert!(err.to_string().contains("GITLAB_TOKEN"));
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let creds = Credentials {
            url: "https://gitlab.com".into(),
            token: "secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
