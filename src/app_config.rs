use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language codes (ISO 639-1) that every published assignment is translated into
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,

    /// Translation provider config
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Publish pipeline tuning
    #[serde(default)]
    pub publish: PublishConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Provider configuration for the OpenAI-compatible translation endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Tuning for the publish pipeline
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PublishConfig {
    /// Maximum number of translation provider calls in flight at once
    #[serde(default = "default_max_concurrent_translations")]
    pub max_concurrent_translations: usize,

    /// Percentage reached when the translation phase starts
    #[serde(default = "default_translation_base_percentage")]
    pub translation_base_percentage: u8,

    /// Percentage span covered by translation sub-task completions
    #[serde(default = "default_translation_range_percentage")]
    pub translation_range_percentage: u8,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_concurrent_translations: default_max_concurrent_translations(),
            translation_base_percentage: default_translation_base_percentage(),
            translation_range_percentage: default_translation_range_percentage(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_supported_languages() -> Vec<String> {
    vec!["en".to_string(), "fr".to_string(), "es".to_string()]
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_concurrent_translations() -> usize {
    10
}

fn default_translation_base_percentage() -> u8 {
    20
}

fn default_translation_range_percentage() -> u8 {
    40
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.supported_languages.is_empty() {
            return Err(anyhow!("At least one supported language is required"));
        }

        // Validate language codes
        for code in &self.supported_languages {
            let _name = crate::language_utils::get_language_name(code)?;
        }

        url::Url::parse(&self.provider.endpoint)
            .map_err(|e| anyhow!("Invalid provider endpoint '{}': {}", self.provider.endpoint, e))?;

        if self.publish.max_concurrent_translations == 0 {
            return Err(anyhow!("max_concurrent_translations must be at least 1"));
        }

        let base = self.publish.translation_base_percentage;
        let range = self.publish.translation_range_percentage;
        if base as u16 + range as u16 > 100 {
            return Err(anyhow!(
                "translation base + range must not exceed 100 (got {} + {})",
                base,
                range
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            supported_languages: default_supported_languages(),
            provider: ProviderConfig::default(),
            publish: PublishConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_shouldValidate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.supported_languages, vec!["en", "fr", "es"]);
        assert_eq!(config.publish.max_concurrent_translations, 10);
    }

    #[test]
    fn test_config_validate_shouldRejectEmptyLanguages() {
        let mut config = Config::default();
        config.supported_languages.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_shouldRejectInvalidLanguageCode() {
        let mut config = Config::default();
        config.supported_languages.push("zz".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_shouldRejectMalformedEndpoint() {
        let mut config = Config::default();
        config.provider.endpoint = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_shouldRejectZeroConcurrency() {
        let mut config = Config::default();
        config.publish.max_concurrent_translations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_shouldRejectOverflowingProgressWindow() {
        let mut config = Config::default();
        config.publish.translation_base_percentage = 80;
        config.publish.translation_range_percentage = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundTrip_shouldPreserveValues() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.supported_languages, config.supported_languages);
        assert_eq!(parsed.provider.model, config.provider.model);
    }
}
