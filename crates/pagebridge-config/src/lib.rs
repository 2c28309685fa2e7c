use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-request timeout used when the config file does not set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Diagnostics payload bound used when the config file does not set one.
pub const DEFAULT_LOG_PAYLOAD_LIMIT: usize = 512;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Environment variable {name} holding the application password is not set")]
    MissingPassword { name: String },
}

/// The remote publishing site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Name of the environment variable holding the application password.
    /// The password itself never goes in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_password_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_log_payload_limit() -> usize {
    DEFAULT_LOG_PAYLOAD_LIMIT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one JSON document per page.
    pub store_path: PathBuf,
    #[serde(default = "default_log_payload_limit")]
    pub log_payload_limit: usize,
    pub site: SiteConfig,
}

impl SiteConfig {
    /// Username and password, when both are configured. A configured
    /// variable that is unset is an error rather than a silent downgrade.
    pub fn credentials(&self) -> Result<Option<(String, String)>, ConfigError> {
        let (Some(username), Some(name)) = (&self.username, &self.app_password_env) else {
            return Ok(None);
        };
        match std::env::var(name) {
            Ok(password) if !password.is_empty() => Ok(Some((username.clone(), password))),
            _ => Err(ConfigError::MissingPassword { name: name.clone() }),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded store path
        config.store_path = Self::expand_path(&config.store_path).unwrap_or(config.store_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/pagebridge");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    fn sample_config() -> Config {
        Config {
            store_path: PathBuf::from("/tmp/test-pages"),
            log_payload_limit: 256,
            site: SiteConfig {
                base_url: "https://example.com".to_string(),
                username: Some("editor".to_string()),
                app_password_env: Some("PAGEBRIDGE_TEST_PASSWORD".to_string()),
                timeout_secs: 5,
            },
        }
    }

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        // Should not contain tilde anymore
        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/pagebridge/config.toml"));
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = sample_config();

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let config: Config = toml::from_str(
            r#"
store_path = "/srv/pages"

[site]
base_url = "https://example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.site.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.log_payload_limit, DEFAULT_LOG_PAYLOAD_LIMIT);
        assert_eq!(config.site.username, None);
        assert!(config.site.credentials().unwrap().is_none());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("PAGEBRIDGE_TEST_VAR", "/test/env/path");
        }

        let path = PathBuf::from("$PAGEBRIDGE_TEST_VAR/subdir");
        let expanded = Config::expand_path(&path);

        assert_eq!(expanded, Some(PathBuf::from("/test/env/path/subdir")));

        unsafe {
            env::remove_var("PAGEBRIDGE_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "store_path = [").unwrap();

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = sample_config();

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
        let written = std::fs::read_to_string(&config_file).unwrap();
        assert!(written.contains("app_password_env = \"PAGEBRIDGE_TEST_PASSWORD\""));
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        unsafe {
            env::set_var("PAGEBRIDGE_ROOT", "/custom/root");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "store_path = \"$PAGEBRIDGE_ROOT/pages\"\n\n[site]\nbase_url = \"https://example.com\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config.store_path, PathBuf::from("/custom/root/pages"));

        unsafe {
            env::remove_var("PAGEBRIDGE_ROOT");
        }
    }

    #[test]
    fn test_credentials_from_environment() {
        let mut site = sample_config().site;
        site.app_password_env = Some("PAGEBRIDGE_CRED_TEST".to_string());

        unsafe {
            env::remove_var("PAGEBRIDGE_CRED_TEST");
        }
        assert!(matches!(
            site.credentials(),
            Err(ConfigError::MissingPassword { ref name }) if name == "PAGEBRIDGE_CRED_TEST"
        ));

        unsafe {
            env::set_var("PAGEBRIDGE_CRED_TEST", "abcd efgh");
        }
        assert_eq!(
            site.credentials().unwrap(),
            Some(("editor".to_string(), "abcd efgh".to_string()))
        );

        unsafe {
            env::remove_var("PAGEBRIDGE_CRED_TEST");
        }
    }
}
