use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tubedigest",
    about = "TubeDigest - Fetch, summarize and question YouTube transcripts",
    version,
    long_about = "A CLI tool for fetching YouTube transcripts through the Supadata API and summarizing them with Gemini. Multiple Supadata API keys are rotated automatically when one is rate limited or rejected."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE", env = "TUBEDIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Credential pool file to use instead of the configured one
    #[arg(long, global = true, value_name = "FILE", env = "TUBEDIGEST_KEYS_FILE")]
    pub keys_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of a video
    Transcript {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Summarize a video with one of the configured actions
    Summarize {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Action (prompt template) to run, see `tubedigest actions`
        #[arg(short, long, value_name = "ACTION")]
        action: Option<String>,

        /// Output language ("auto" follows the transcript)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Ask a question answered from the video transcript
    Ask {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Question about the video
        #[arg(value_name = "QUESTION")]
        question: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage Supadata API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// List available summary actions
    Actions,

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum KeysCommand {
    /// List keys in rotation order
    List,

    /// Add a key to the pool
    Add {
        /// API key value, read from stdin when omitted
        #[arg(value_name = "KEY", env = "TUBEDIGEST_NEW_KEY", hide_env_values = true)]
        secret: Option<String>,

        /// Optional label
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Remove a key by id
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Make a key active and clear its degraded flag
    Activate {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Clear the degraded flag on every key
    Reset,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text (Markdown for summaries and answers)
    Text,
    /// JSON with metadata
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::parse_from([
            "tubedigest",
            "summarize",
            "https://youtu.be/dQw4w9WgXcQ",
            "-a",
            "highlights",
            "-f",
            "json",
            "--quiet",
        ]);
        assert!(cli.quiet);
        match cli.command {
            Commands::Summarize { action, format, .. } => {
                assert_eq!(action.as_deref(), Some("highlights"));
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_parse_keys_add() {
        let cli = Cli::parse_from(["tubedigest", "keys", "add", "abc123", "--name", "work"]);
        match cli.command {
            Commands::Keys {
                command: KeysCommand::Add { secret, name },
            } => {
                assert_eq!(secret.as_deref(), Some("abc123"));
                assert_eq!(name.as_deref(), Some("work"));
            }
            _ => panic!("expected keys add"),
        }
    }

    #[test]
    fn test_parse_keys_add_without_value() {
        std::env::remove_var("TUBEDIGEST_NEW_KEY");
        let cli = Cli::parse_from(["tubedigest", "keys", "add"]);
        match cli.command {
            Commands::Keys {
                command: KeysCommand::Add { secret, name },
            } => {
                assert!(secret.is_none());
                assert!(name.is_none());
            }
            _ => panic!("expected keys add"),
        }
    }
}
