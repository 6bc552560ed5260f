use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod gemini;

pub use gemini::GeminiClient;

pub const TRANSCRIPT_PLACEHOLDER: &str = "{{transcript}}";
pub const LANGUAGE_PLACEHOLDER: &str = "{{language}}";
pub const QUESTION_PLACEHOLDER: &str = "{{question}}";

pub const DEFAULT_ACTION: &str = "summary";

const SUMMARY_PROMPT: &str = "Summarize the following video transcript. \
Start with a short overview under a \"### Summary\" heading, then list the key points \
under a \"### Highlights\" heading as bullet points, each with a fitting emoji. \
{{language}}\n\n---\n\n{{transcript}}";

const HIGHLIGHTS_PROMPT: &str = "List the most important takeaways of the following \
video transcript as concise bullet points, in the order they appear. \
{{language}}\n\n---\n\n{{transcript}}";

const ASK_PROMPT: &str = "Answer the question using only the video transcript below. \
If the transcript does not contain the answer, say that the video does not cover it. \
{{language}}\n\nTranscript:\n{{transcript}}\n\nQuestion: {{question}}";

/// A named prompt template the user can pick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAction {
    pub name: String,
    pub prompt: String,
}

impl CustomAction {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
        }
    }
}

/// Actions shipped with the tool
pub fn builtin_actions() -> Vec<CustomAction> {
    vec![
        CustomAction::new(DEFAULT_ACTION, SUMMARY_PROMPT),
        CustomAction::new("highlights", HIGHLIGHTS_PROMPT),
    ]
}

/// Built-in actions followed by user actions; user actions replace built-ins of the same name
pub fn merge_actions(user: &[CustomAction]) -> Vec<CustomAction> {
    let mut actions: Vec<CustomAction> = builtin_actions()
        .into_iter()
        .filter(|builtin| !user.iter().any(|a| a.name == builtin.name))
        .collect();
    actions.extend(user.iter().cloned());
    actions
}

pub fn find_action<'a>(actions: &'a [CustomAction], name: &str) -> Option<&'a CustomAction> {
    actions.iter().find(|a| a.name.eq_ignore_ascii_case(name))
}

/// Values substituted into a prompt template
#[derive(Debug, Default, Clone)]
pub struct PromptVars<'a> {
    pub transcript: &'a str,
    pub language: Option<&'a str>,
    pub question: Option<&'a str>,
}

/// Instruction sentence for the output language
pub fn language_instruction(language: Option<&str>) -> String {
    match language.map(str::trim) {
        None | Some("") => String::new(),
        Some(lang) if lang.eq_ignore_ascii_case("auto") => {
            "Respond in the same language as the transcript.".to_string()
        }
        Some(lang) => format!("Respond in {}.", lang),
    }
}

/// Substitute placeholders in `template`
pub fn render_prompt(template: &str, vars: &PromptVars<'_>) -> String {
    template
        .replace(LANGUAGE_PLACEHOLDER, &language_instruction(vars.language))
        .replace(QUESTION_PLACEHOLDER, vars.question.unwrap_or_default())
        // transcript last so its contents are never re-scanned for placeholders
        .replace(TRANSCRIPT_PLACEHOLDER, vars.transcript)
}

/// Prompt for a free-form question about a transcript
pub fn ask_prompt(transcript: &str, question: &str, language: Option<&str>) -> String {
    render_prompt(
        ASK_PROMPT,
        &PromptVars {
            transcript,
            language,
            question: Some(question),
        },
    )
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_transcript(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            tracing::warn!(
                "Transcript length exceeds {} characters, truncating",
                max_chars
            );
            &text[..idx]
        }
        None => text,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("Gemini API request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Gemini API returned no text: {0}")]
    EmptyResponse(String),

    #[error("Gemini API unreachable: {0}")]
    Transport(String),
}

/// Text generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
