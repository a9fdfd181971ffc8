//! Application configuration for SiteSage.
//!
//! User config lives at `~/.sitesage/sitesage.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SitesageError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitesage.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitesage";

/// Site registry database file name, kept next to the config file.
const REGISTRY_DB_NAME: &str = "sitesage.db";

// ---------------------------------------------------------------------------
// Config structs (matching sitesage.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl defaults.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Knowledge-base service settings.
    #[serde(default)]
    pub kb_service: KbServiceConfig,

    /// Question-answering settings.
    #[serde(default)]
    pub qa: QaConfig,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// URLs fetched concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Crawl localhost and private-range addresses. Off unless the user
    /// is ingesting an intranet site.
    #[serde(default)]
    pub allow_private_targets: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            request_timeout_secs: default_request_timeout(),
            allow_private_targets: false,
        }
    }
}

fn default_batch_size() -> usize {
    25
}
fn default_request_timeout() -> u64 {
    30
}

/// `[kb_service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbServiceConfig {
    /// Base URL of the knowledge-base / conversation service.
    #[serde(default = "default_service_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Interval between upload-processing polls, in milliseconds.
    #[serde(default = "default_upload_poll_interval")]
    pub upload_poll_interval_ms: u64,

    /// Give up waiting for an upload to process after this many seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

impl Default for KbServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            api_key_env: default_api_key_env(),
            upload_poll_interval_ms: default_upload_poll_interval(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

fn default_service_url() -> String {
    "https://kb.sitesage.dev".into()
}
fn default_api_key_env() -> String {
    "SITESAGE_API_KEY".into()
}
fn default_upload_poll_interval() -> u64 {
    500
}
fn default_upload_timeout() -> u64 {
    60
}

/// `[qa]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaConfig {
    /// Interval between run-status polls, in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Give up on a run after this many seconds without a terminal status.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            run_timeout_secs: default_run_timeout(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}
fn default_run_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// URLs fetched concurrently per batch. Always at least 1.
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Crawl localhost and private-range addresses.
    pub allow_private_targets: bool,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            // Batch size 0 would make the chunker produce nothing.
            batch_size: config.crawl.batch_size.max(1),
            request_timeout_secs: config.crawl.request_timeout_secs,
            allow_private_targets: config.crawl.allow_private_targets,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sitesage/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SitesageError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sitesage/sitesage.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path to the site registry database (`~/.sitesage/sitesage.db`).
pub fn registry_db_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(REGISTRY_DB_NAME))
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
    let content = std::fs::read_to_string(path).map_err(|e| SitesageError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| SitesageError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SitesageError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SitesageError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SitesageError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the service API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.kb_service.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(SitesageError::config(format!(
            "knowledge-base service API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("batch_size"));
        assert!(toml_str.contains("SITESAGE_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.crawl.batch_size, 25);
        assert_eq!(parsed.kb_service.api_key_env, "SITESAGE_API_KEY");
        assert_eq!(parsed.qa.poll_interval_ms, 1000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[crawl]
batch_size = 10

[kb_service]
base_url = "https://kb.internal.example.com"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.crawl.batch_size, 10);
        assert_eq!(config.crawl.request_timeout_secs, 30);
        assert_eq!(config.kb_service.base_url, "https://kb.internal.example.com");
        assert_eq!(config.qa.run_timeout_secs, 120);
    }

    #[test]
    fn crawl_config_clamps_zero_batch_size() {
        let mut app = AppConfig::default();
        app.crawl.batch_size = 0;
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.batch_size, 1);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.kb_service.api_key_env = "SITESAGE_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
