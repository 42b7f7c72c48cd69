//! Configuration management for Shukan.
//!
//! Handles loading, saving, and validating configuration from
//! platform-specific config directories, with a small set of environment
//! overrides for secrets and deployment settings.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application name used for config and data directories.
const APP_NAME: &str = "Shukan";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Default database filename.
const DATABASE_FILENAME: &str = "data.db";

/// Placeholder value for unconfigured API keys.
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Entity store settings.
    pub store: StoreConfig,

    /// Web scraping settings.
    pub scraping: ScrapingConfig,

    /// Per-novel lock settings.
    pub lock: LockConfig,

    /// Which translation backend to use and how.
    pub provider: ProviderConfig,

    /// OpenAI-compatible API configuration.
    pub openai: ApiConfig,

    /// Gemini API configuration.
    pub gemini: ApiConfig,

    /// LLM prompts.
    pub prompts: PromptsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            scraping: ScrapingConfig::default(),
            lock: LockConfig::default(),
            provider: ProviderConfig::default(),
            openai: ApiConfig::openai_default(),
            gemini: ApiConfig::gemini_default(),
            prompts: PromptsConfig::default(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,

    /// Origins allowed by the CORS middleware.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8088".to_string(),
            allowed_origins: vec!["http://localhost:8080".to_string()],
        }
    }
}

/// Entity store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
}

/// Web scraping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Attempts per page fetch before giving up.
    pub retries: u32,

    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Per-attempt request timeout in seconds.
    pub timeout_sec: u64,

    /// Delay before every web request in seconds.
    pub delay_between_requests_sec: f64,

    /// Browser user agent sent with every request.
    pub user_agent: String,

    /// Directory searched for Netscape cookie files.
    pub cookie_directory: Option<PathBuf>,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 1000,
            timeout_sec: 30,
            delay_between_requests_sec: 0.0,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            cookie_directory: None,
        }
    }
}

impl ScrapingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

/// Per-novel lock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// How long an acquisition polls before reporting the key as busy.
    pub acquire_timeout_ms: u64,

    /// Sleep between acquisition attempts.
    pub poll_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            acquire_timeout_ms: 10,
            poll_interval_ms: 10,
        }
    }
}

impl LockConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Available translation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderBackend {
    #[default]
    Gemini,
    OpenAi,
}

/// Translation provider selection and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Backend used by the pipeline.
    pub backend: ProviderBackend,

    /// Sampling temperature.
    pub temperature: f32,

    /// Output token ceiling per request.
    pub max_output_tokens: u32,

    /// Per-request timeout in seconds. Zero disables the timeout.
    pub timeout_sec: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: ProviderBackend::Gemini,
            temperature: 0.3,
            max_output_tokens: 65000,
            timeout_sec: 600,
        }
    }
}

/// API configuration for LLM endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key (required for the selected backend).
    pub key: String,

    /// Base URL for the API. Empty means the backend's default.
    pub base_url: String,

    /// Model identifier. Empty means the backend's default.
    pub model: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: String::new(),
            model: String::new(),
        }
    }
}

impl ApiConfig {
    /// Default settings for an OpenAI-compatible API.
    pub fn openai_default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }

    /// Default settings for the Gemini REST API.
    pub fn gemini_default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }

    /// Checks if the API key is configured (not placeholder).
    pub fn is_configured(&self) -> bool {
        !self.key.is_empty() && self.key != API_KEY_PLACEHOLDER
    }
}

/// LLM prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Prompt for extracting and translating novel landing-page details.
    pub novel_details: String,

    /// Prompt for translating one chapter.
    pub chapter: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            novel_details: r#"You are a professional translator for web novels.
Extract and translate information from the novel page content the user sends.
Return ONLY a JSON object with this exact structure:
{"novel_title_original":"<title in the source language>","novel_title_translated":"<title in English>","novel_summary_translated":"<summary in English as HTML paragraphs>","novel_author_name_translated":"<author name in English>","possible_novel_genres":["Genre1","Genre2"],"number_of_chapters":<total chapters as integer>,"status":"Ongoing|Completed|Unknown"}
No commentary, explanation, or preamble."#.to_string(),
            chapter: r#"You are an expert web novel translator and editor. Translate and polish the chapter the user sends into natural English with correct grammar. Translate names of places, abilities and techniques into English. Keep every plot point and system message; do not add content of your own. Stop when the chapter ends.
Return ONLY a JSON object with this exact structure:
{"translated_chapter_title":"<title in English>","original_chapter_title":"<title in the source language>","translated_chapter_contents":"<full chapter in English as HTML paragraphs>","possible_new_genres":["<genres not already known, empty if none>"]}
No commentary, explanation, or preamble."#.to_string(),
        }
    }
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    ///
    /// If the config file doesn't exist, creates a default one.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Applies environment overrides on top of the loaded file.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini.key = key;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.key = key;
        }
        if let Some(base_url) = lookup("OPENAI_API_BASE_URL") {
            self.openai.base_url = base_url;
        }
        if let Some(bind) = lookup("SHUKAN_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = lookup("SHUKAN_DB_PATH") {
            self.store.database_path = Some(PathBuf::from(path));
        }
    }

    /// Returns the API settings of the selected backend.
    pub fn active_api(&self) -> &ApiConfig {
        match self.provider.backend {
            ProviderBackend::Gemini => &self.gemini,
            ProviderBackend::OpenAi => &self.openai,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.active_api().is_configured() {
            let section = match self.provider.backend {
                ProviderBackend::Gemini => "gemini.key (or GEMINI_API_KEY)",
                ProviderBackend::OpenAi => "openai.key (or OPENAI_API_KEY)",
            };
            return Err(ConfigError::MissingValue(section.to_string()));
        }

        if self.scraping.retries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scraping.retries".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "server.bind".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the effective database path, using config or default.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.store.database_path {
            return Ok(path.clone());
        }

        dirs::data_dir()
            .map(|p| p.join(APP_NAME).join(DATABASE_FILENAME))
            .ok_or(ConfigError::NoConfigDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.active_api().is_configured());
        assert_eq!(config.provider.backend, ProviderBackend::Gemini);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.scraping.retries, 3);
        assert_eq!(config.server.bind, "0.0.0.0:8088");
    }

    #[test]
    fn test_api_configured_check() {
        let mut api = ApiConfig::default();
        assert!(!api.is_configured());

        api.key = "sk-real-key".to_string();
        assert!(api.is_configured());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.gemini.model, config.gemini.model);
        assert_eq!(reloaded.lock.acquire_timeout_ms, config.lock.acquire_timeout_ms);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider]\nbackend = \"openai\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.provider.backend, ProviderBackend::OpenAi);
        assert_eq!(config.scraping.retry_delay_ms, 1000);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_partial_api_section_leaves_backend_defaults_blank() {
        let config: Config = toml::from_str("[gemini]\nkey = \"g-key\"\n").unwrap();
        assert!(config.gemini.is_configured());
        assert!(config.gemini.base_url.is_empty());
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "g-key"),
            ("OPENAI_API_BASE_URL", "http://localhost:1234/v1"),
            ("SHUKAN_BIND", "127.0.0.1:9000"),
            ("OPENAI_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.gemini.key, "g-key");
        assert_eq!(config.openai.base_url, "http://localhost:1234/v1");
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert!(!config.openai.is_configured());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gemini.key = "real-key".to_string();
        assert!(config.validate().is_ok());

        config.scraping.retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_follows_backend() {
        let mut config = Config::default();
        config.gemini.key = "real-key".to_string();
        config.provider.backend = ProviderBackend::OpenAi;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_database_path() {
        let mut config = Config::default();
        config.store.database_path = Some(PathBuf::from("/tmp/novels.db"));
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/novels.db"));
    }
}
