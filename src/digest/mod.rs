use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::rotation::CredentialRotator;
use crate::summarize::{self, GeminiClient, LanguageModel, LlmError, PromptVars};
use crate::transcript::SupadataClient;
use crate::utils;

/// What a [`DigestResult`] contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DigestKind {
    Transcript,
    Summary { action: String },
    Answer { question: String },
}

/// Result of one user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestResult {
    pub video_url: String,

    pub video_id: Option<String>,

    #[serde(flatten)]
    pub kind: DigestKind,

    /// Transcript text, summary or answer depending on `kind`
    pub content: String,

    /// Length of the transcript the content is based on
    pub transcript_chars: usize,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Fetches transcripts with key rotation and runs prompts over them
pub struct DigestPipeline {
    config: Config,
    rotator: CredentialRotator,
    model: Option<Arc<dyn LanguageModel>>,
    show_progress: bool,
}

impl DigestPipeline {
    /// Build the pipeline from configuration
    pub fn new(config: Config, keys_file: Option<PathBuf>, show_progress: bool) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(open_store(&config, keys_file)?);

        let service = SupadataClient::new(&config.supadata.base_url, config.supadata_timeout())?
            .with_language(config.supadata.transcript_language.clone());

        let model: Option<Arc<dyn LanguageModel>> = match config.gemini_api_key() {
            Some(key) => Some(Arc::new(
                GeminiClient::new(
                    &config.gemini.base_url,
                    &config.gemini.model,
                    key,
                    config.gemini_timeout(),
                )?
                .with_generation(config.gemini.temperature, config.gemini.max_output_tokens),
            )),
            None => None,
        };

        let rotator = CredentialRotator::new(store, Arc::new(service));
        Ok(Self::with_parts(config, rotator, model).show_progress(show_progress))
    }

    /// Assemble from prebuilt parts
    pub fn with_parts(
        config: Config,
        rotator: CredentialRotator,
        model: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            config,
            rotator,
            model,
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fetch the raw transcript
    pub async fn transcript(&self, url: &str) -> Result<DigestResult> {
        let (video_url, video_id) = Self::check_url(url)?;
        let transcript = self.fetch(&video_url).await?;

        if transcript.trim().is_empty() {
            tracing::warn!("Transcript for {} is empty", video_url);
        }

        Ok(DigestResult {
            video_url,
            video_id,
            kind: DigestKind::Transcript,
            transcript_chars: transcript.chars().count(),
            content: transcript,
            completed_at: chrono::Utc::now(),
        })
    }

    /// Run a named action over the transcript
    pub async fn summarize(
        &self,
        url: &str,
        action: Option<&str>,
        language: Option<&str>,
    ) -> Result<DigestResult> {
        let actions = self.config.actions();
        let action_name = action.unwrap_or(&self.config.app.default_action);
        let action = summarize::find_action(&actions, action_name)
            .ok_or_else(|| anyhow::anyhow!("Unknown action '{}'", action_name))?
            .clone();
        let model = self.model()?;

        let (video_url, video_id) = Self::check_url(url)?;
        let transcript = self.fetch_non_empty(&video_url).await?;

        let prompt = summarize::render_prompt(
            &action.prompt,
            &PromptVars {
                transcript: summarize::truncate_transcript(
                    &transcript,
                    self.config.app.max_transcript_chars,
                ),
                language: Some(language.unwrap_or(&self.config.app.summary_language)),
                question: None,
            },
        );

        tracing::info!("Running action '{}' for {}", action.name, video_url);
        let content = self.generate(model.as_ref(), &prompt).await?;

        Ok(DigestResult {
            video_url,
            video_id,
            kind: DigestKind::Summary {
                action: action.name,
            },
            content,
            transcript_chars: transcript.chars().count(),
            completed_at: chrono::Utc::now(),
        })
    }

    /// Answer a question using only the transcript
    pub async fn ask(&self, url: &str, question: &str) -> Result<DigestResult> {
        let question = question.trim();
        if question.is_empty() {
            anyhow::bail!("Question cannot be empty");
        }
        let model = self.model()?;

        let (video_url, video_id) = Self::check_url(url)?;
        let transcript = self.fetch_non_empty(&video_url).await?;

        let prompt = summarize::ask_prompt(
            summarize::truncate_transcript(&transcript, self.config.app.max_transcript_chars),
            question,
            Some(&self.config.app.summary_language),
        );

        tracing::info!("Answering question for {}", video_url);
        let content = self.generate(model.as_ref(), &prompt).await?;

        Ok(DigestResult {
            video_url,
            video_id,
            kind: DigestKind::Answer {
                question: question.to_string(),
            },
            content,
            transcript_chars: transcript.chars().count(),
            completed_at: chrono::Utc::now(),
        })
    }

    fn check_url(url: &str) -> Result<(String, Option<String>)> {
        let normalized = utils::validate_and_normalize_url(url)?;
        if !utils::is_youtube_url(&normalized) {
            anyhow::bail!("Not a YouTube URL: {}", url);
        }
        let video_id = utils::extract_video_id(&normalized);
        Ok((normalized, video_id))
    }

    fn model(&self) -> Result<Arc<dyn LanguageModel>> {
        self.model
            .clone()
            .ok_or(LlmError::MissingApiKey)
            .context("Set GEMINI_API_KEY or gemini.api_key in the config file")
    }

    async fn fetch(&self, video_url: &str) -> Result<String> {
        let spinner = self.spinner("Fetching transcript...");
        let result = self.rotator.fetch_with_rotation(video_url).await;
        spinner.finish_and_clear();

        result.map_err(|e| {
            let hint = if e.needs_configuration() {
                "Add or reactivate keys with `tubedigest keys`"
            } else {
                "Failed to fetch transcript"
            };
            anyhow::Error::new(e).context(hint)
        })
    }

    async fn fetch_non_empty(&self, video_url: &str) -> Result<String> {
        let transcript = self.fetch(video_url).await?;
        if transcript.trim().is_empty() {
            anyhow::bail!("Received an empty transcript for {}", video_url);
        }
        Ok(transcript)
    }

    async fn generate(&self, model: &dyn LanguageModel, prompt: &str) -> Result<String> {
        let spinner = self.spinner("Waiting for the model...");
        let result = model.generate(prompt).await;
        spinner.finish_and_clear();
        Ok(result?)
    }

    fn spinner(&self, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

/// Credential store chosen by CLI override, config, or the default location
pub fn open_store(config: &Config, keys_file: Option<PathBuf>) -> Result<FileCredentialStore> {
    match keys_file.or_else(|| config.app.keys_file.clone()) {
        Some(path) => Ok(FileCredentialStore::new(path)),
        None => FileCredentialStore::new_default().context("Failed to locate credential store"),
    }
}
