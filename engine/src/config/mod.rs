//! Configuration management
//!
//! This module handles loading, validation, and management of the Codify configuration.
//! Configuration is stored in TOML format at ~/.codify/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Default backend plus per-backend endpoint, model and temperature
//! - **langsmith**: Tracing endpoint, public web URL, project and run tags
//! - **chat**: Input limit, memory window and default feedback style
//! - **ui**: Bind address of the browser chat host
//!
//! API keys never live in this file; they are read through
//! [`SecretManager`](crate::secrets::SecretManager).
//!
//! # Examples
//!
//! ```no_run
//! use codify_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Default backend: {}", config.llm.default_backend);
//! println!("Project: {}", config.langsmith.project);
//! # Ok(())
//! # }
//! ```

use sdk::errors::CodifyError;
use sdk::types::{Backend, FeedbackStyle};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// LLM backend configuration
    pub llm: LLMConfig,

    /// Tracing service configuration
    #[serde(default)]
    pub langsmith: LangSmithConfig,

    /// Chat behaviour
    #[serde(default)]
    pub chat: ChatConfig,

    /// Browser host settings
    #[serde(default)]
    pub ui: UiConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Backend preselected in the UI and CLI (mistral, gemini)
    #[serde(default)]
    pub default_backend: Backend,

    /// Gemini backend settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Mistral backend settings
    #[serde(default)]
    pub mistral: MistralConfig,
}

/// Gemini backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    // Note: API key stored in OS keychain, not in config
}

/// Mistral backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MistralConfig {
    /// Base URL for Mistral API
    #[serde(default = "default_mistral_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_mistral_model")]
    pub model: String,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    // Note: API key stored in OS keychain, not in config
}

/// LangSmith tracing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LangSmithConfig {
    /// REST endpoint runs and feedback are posted to
    #[serde(default = "default_langsmith_endpoint")]
    pub endpoint: String,

    /// Public web app; shared trace links are built from it
    #[serde(default = "default_langsmith_web_url")]
    pub web_url: String,

    /// Project label runs are filed under
    #[serde(default = "default_project")]
    pub project: String,

    /// Start sessions with the stored demo key selected
    #[serde(default = "default_true")]
    pub use_demo_key: bool,

    /// Tags attached to every traced run
    #[serde(default = "default_tags")]
    pub tags: Vec<String>,
}

/// Chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Longest accepted user input, in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Number of user/assistant pairs passed to the model as history
    #[serde(default = "default_memory_window_pairs")]
    pub memory_window_pairs: usize,

    /// Rating widget shown first
    #[serde(default)]
    pub default_feedback_style: FeedbackStyle,
}

/// Browser host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Address the chat page is served on
    #[serde(default = "default_bind")]
    pub bind: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_mistral_base_url() -> String {
    "https://api.mistral.ai/v1".to_string()
}

fn default_mistral_model() -> String {
    "mistral-large-latest".to_string()
}

fn default_temperature() -> f64 {
    0.3
}

fn default_langsmith_endpoint() -> String {
    "https://api.smith.langchain.com".to_string()
}

fn default_langsmith_web_url() -> String {
    "https://smith.langchain.com".to_string()
}

fn default_project() -> String {
    "Codify Demo".to_string()
}

fn default_tags() -> Vec<String> {
    vec!["Codify Chat".to_string()]
}

fn default_max_input_chars() -> usize {
    500
}

fn default_memory_window_pairs() -> usize {
    5
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            temperature: default_temperature(),
        }
    }
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            base_url: default_mistral_base_url(),
            model: default_mistral_model(),
            temperature: default_temperature(),
        }
    }
}

impl Default for LangSmithConfig {
    fn default() -> Self {
        Self {
            endpoint: default_langsmith_endpoint(),
            web_url: default_langsmith_web_url(),
            project: default_project(),
            use_demo_key: true,
            tags: default_tags(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            memory_window_pairs: default_memory_window_pairs(),
            default_feedback_style: FeedbackStyle::default(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.codify/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, CodifyError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Load configuration from `path`, writing defaults there first if it is missing
    pub fn load_or_create_at(path: &Path) -> Result<Self, CodifyError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, CodifyError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CodifyError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self, CodifyError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| CodifyError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, CodifyError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CodifyError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = config.to_toml()?;

        fs::write(path, toml_string)
            .map_err(|e| CodifyError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());

        Ok(config)
    }

    /// Serialize to the on-disk TOML form
    pub fn to_toml(&self) -> Result<String, CodifyError> {
        toml::to_string_pretty(self)
            .map_err(|e| CodifyError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path (~/.codify/config.toml)
    pub fn default_config_path() -> Result<PathBuf, CodifyError> {
        let home = dirs::home_dir()
            .ok_or_else(|| CodifyError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".codify").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
            },
            llm: LLMConfig {
                default_backend: Backend::default(),
                gemini: GeminiConfig::default(),
                mistral: MistralConfig::default(),
            },
            langsmith: LangSmithConfig::default(),
            chat: ChatConfig::default(),
            ui: UiConfig::default(),
        }
    }

    /// Parsed bind address of the browser host
    pub fn bind_addr(&self) -> Result<SocketAddr, CodifyError> {
        self.ui
            .bind
            .parse()
            .map_err(|e| CodifyError::Config(format!("Invalid ui.bind '{}': {}", self.ui.bind, e)))
    }

    /// Validate and normalize configuration
    ///
    /// Trailing slashes are stripped from every URL so request paths can be
    /// appended with a single `/`.
    fn validate_and_process(&mut self) -> Result<(), CodifyError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(CodifyError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        for (name, temperature) in [
            ("llm.gemini.temperature", self.llm.gemini.temperature),
            ("llm.mistral.temperature", self.llm.mistral.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(CodifyError::Config(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        self.llm.gemini.base_url = normalize_url("llm.gemini.base_url", &self.llm.gemini.base_url)?;
        self.llm.mistral.base_url =
            normalize_url("llm.mistral.base_url", &self.llm.mistral.base_url)?;
        self.langsmith.endpoint = normalize_url("langsmith.endpoint", &self.langsmith.endpoint)?;
        self.langsmith.web_url = normalize_url("langsmith.web_url", &self.langsmith.web_url)?;

        if self.langsmith.project.trim().is_empty() {
            return Err(CodifyError::Config(
                "langsmith.project must not be empty".to_string(),
            ));
        }

        if self.chat.max_input_chars == 0 {
            return Err(CodifyError::Config(
                "chat.max_input_chars must be greater than 0".to_string(),
            ));
        }
        if self.chat.memory_window_pairs == 0 {
            return Err(CodifyError::Config(
                "chat.memory_window_pairs must be greater than 0".to_string(),
            ));
        }

        self.bind_addr()?;

        Ok(())
    }
}

/// Check that `url` is http(s) and strip trailing slashes
fn normalize_url(field: &str, url: &str) -> Result<String, CodifyError> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(CodifyError::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            field, url
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_backend, Backend::Gemini);
        assert_eq!(config.chat.max_input_chars, 500);
        assert_eq!(config.chat.memory_window_pairs, 5);
        assert_eq!(config.langsmith.tags, vec!["Codify Chat".to_string()]);
        assert!(config.langsmith.use_demo_key);
        assert_eq!(config.ui.bind, "127.0.0.1:8501");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = config.to_toml().unwrap();

        let deserialized = Config::from_toml(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.default_backend, deserialized.llm.default_backend);
        assert_eq!(config.langsmith.project, deserialized.langsmith.project);
    }

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [core]
            [llm]
            default_backend = "mistral"
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.default_backend, Backend::Mistral);
        assert_eq!(config.llm.mistral.base_url, "https://api.mistral.ai/v1");
        assert_eq!(config.langsmith.endpoint, "https://api.smith.langchain.com");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml(
            r#"
            [core]
            log_level = "loud"
            [llm]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_trailing_slash_stripped() {
        assert_eq!(
            normalize_url("x", "https://api.smith.langchain.com/").unwrap(),
            "https://api.smith.langchain.com"
        );
        assert!(normalize_url("x", "ftp://example.com").is_err());
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let mut config = Config::default_config();
        config.ui.bind = "localhost".to_string();
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_temperature_range() {
        let mut config = Config::default_config();
        config.llm.gemini.temperature = 3.5;
        assert!(config.validate_and_process().is_err());
    }
}
