//! Application configuration for rosbot-collector.
//!
//! User config lives at `~/.rosbot/rosbot.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosbotError};
use crate::types::FilterConfig;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rosbot.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rosbot";

/// Site the collector talks to when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.ros-bot.com";

// ---------------------------------------------------------------------------
// Config structs (matching rosbot.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub account: AccountConfig,

    /// Filter applied when the command line does not override it.
    #[serde(default)]
    pub defaults: FilterConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the site, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request transport timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    10
}

/// `[account]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Username or email used to log in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Name of the env var holding the password (never store the password itself).
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: None,
            password_env: default_password_env(),
        }
    }
}

fn default_password_env() -> String {
    "ROSBOT_PASSWORD".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rosbot/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RosbotError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rosbot/rosbot.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosbotError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| RosbotError::config(format!("failed to parse {}: {e}", path.display())))?;

    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosbotError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| RosbotError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosbotError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the site or the collector cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    url::Url::parse(&config.site.base_url).map_err(|e| {
        RosbotError::config(format!("invalid base_url '{}': {e}", config.site.base_url))
    })?;

    if config.site.timeout_secs == 0 {
        return Err(RosbotError::config("timeout_secs must be greater than zero"));
    }

    if config.defaults.page == 0 {
        return Err(RosbotError::config("pages are numbered from 1"));
    }

    Ok(())
}

/// Read the account password from the configured env var.
pub fn resolve_password(config: &AppConfig) -> Result<String> {
    let var_name = &config.account.password_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(RosbotError::config(format!(
            "password not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Destination, QualityFilter, Rarity};

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("ROSBOT_PASSWORD"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.site.timeout_secs, 10);
        assert_eq!(parsed.site.base_url, DEFAULT_BASE_URL);
        assert_eq!(parsed.defaults.page, 1);
    }

    #[test]
    fn config_with_filter_defaults() {
        let toml_str = r#"
[account]
username = "farmer"

[defaults]
destinations = ["stashed", "SOLD"]
rarity = "ancient"
quality = "SET"
page = 2
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.account.username.as_deref(), Some("farmer"));
        assert_eq!(config.defaults.destinations.len(), 2);
        assert!(config.defaults.destinations.contains(&Destination::Sold));
        assert_eq!(config.defaults.rarity, Rarity::Ancient);
        assert_eq!(config.defaults.quality, QualityFilter::Set);
        assert_eq!(config.defaults.page, 2);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.site.base_url = "not a url".into();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.site.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.defaults.page = 0;
        assert!(validate_config(&config).is_err());

        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join(format!("rosbot-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[site]\ntimeout_secs = 30\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.site.timeout_secs, 30);
        assert_eq!(config.site.base_url, DEFAULT_BASE_URL);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_password_env() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.account.password_env = "ROSBOT_TEST_NONEXISTENT_PASSWORD_12345".into();
        let result = resolve_password(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("password not found"));
    }
}
