use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::summarize::{self, CustomAction, TRANSCRIPT_PLACEHOLDER};
use crate::transcript::supadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcript API settings
    pub supadata: SupadataConfig,

    /// Language model settings
    pub gemini: GeminiConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupadataConfig {
    /// Transcript endpoint
    pub base_url: String,

    /// Per-request timeout in seconds; a timed out request counts as a transport failure
    pub timeout_secs: u64,

    /// Preferred transcript language ("auto" lets the API decide)
    pub transcript_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key, overridden by `GEMINI_API_KEY`
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    pub temperature: f32,

    pub max_output_tokens: u32,

    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential pool file (defaults to the user config directory)
    pub keys_file: Option<PathBuf>,

    /// Output language for summaries and answers
    pub summary_language: String,

    /// Transcripts longer than this are truncated before prompting
    pub max_transcript_chars: usize,

    /// Action used by `summarize` when none is given
    pub default_action: String,

    /// User defined prompt templates
    #[serde(default)]
    pub custom_actions: Vec<CustomAction>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supadata: SupadataConfig {
                base_url: supadata::DEFAULT_BASE_URL.to_string(),
                timeout_secs: 30,
                transcript_language: None,
            },
            gemini: GeminiConfig {
                api_key: None,
                base_url: summarize::gemini::DEFAULT_BASE_URL.to_string(),
                model: summarize::gemini::DEFAULT_MODEL.to_string(),
                temperature: 0.7,
                max_output_tokens: 8192,
                timeout_secs: 120,
            },
            app: AppConfig {
                keys_file: None,
                summary_language: "auto".to_string(),
                max_transcript_chars: 30_000,
                default_action: summarize::DEFAULT_ACTION.to_string(),
                custom_actions: Vec::new(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(&config_path).await?;
            tracing::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to file
    async fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubedigest").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.supadata.base_url.trim().is_empty() {
            anyhow::bail!("Supadata base URL must be configured");
        }
        crate::utils::validate_and_normalize_url(&self.supadata.base_url)
            .context("Invalid Supadata base URL")?;

        if self.supadata.timeout_secs == 0 || self.gemini.timeout_secs == 0 {
            anyhow::bail!("Request timeouts must be at least one second");
        }

        if self.app.max_transcript_chars == 0 {
            anyhow::bail!("max_transcript_chars must be greater than zero");
        }

        for (i, action) in self.app.custom_actions.iter().enumerate() {
            if action.name.trim().is_empty() {
                anyhow::bail!("Custom action #{} has no name", i + 1);
            }
            if !action.prompt.contains(TRANSCRIPT_PLACEHOLDER) {
                anyhow::bail!(
                    "Custom action '{}' must contain the {} placeholder",
                    action.name,
                    TRANSCRIPT_PLACEHOLDER
                );
            }
            let duplicate = self.app.custom_actions[..i]
                .iter()
                .any(|other| other.name.eq_ignore_ascii_case(&action.name));
            if duplicate {
                anyhow::bail!("Custom action '{}' is defined twice", action.name);
            }
        }

        let actions = self.actions();
        if summarize::find_action(&actions, &self.app.default_action).is_none() {
            anyhow::bail!("Default action '{}' does not exist", self.app.default_action);
        }

        Ok(())
    }

    /// Built-in and user actions
    pub fn actions(&self) -> Vec<CustomAction> {
        summarize::merge_actions(&self.app.custom_actions)
    }

    /// Gemini key from the environment or the config file
    pub fn gemini_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| self.gemini.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn supadata_timeout(&self) -> Duration {
        Duration::from_secs(self.supadata.timeout_secs)
    }

    pub fn gemini_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_secs)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Supadata URL: {}", self.supadata.base_url);
        println!("  Request Timeout: {}s", self.supadata.timeout_secs);
        if let Some(lang) = &self.supadata.transcript_language {
            println!("  Transcript Language: {}", lang);
        }
        println!("  Gemini Model: {}", self.gemini.model);
        println!(
            "  Gemini API Key: {}",
            self.gemini_api_key()
                .map(|key| crate::credentials::mask_secret(&key))
                .unwrap_or_else(|| "(not set)".to_string())
        );
        println!("  Summary Language: {}", self.app.summary_language);
        println!("  Default Action: {}", self.app.default_action);
        println!("  Custom Actions: {}", self.app.custom_actions.len());
        if let Some(path) = &self.app.keys_file {
            println!("  Keys File: {}", path.display());
        }
    }
}
