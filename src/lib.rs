//! TubeDigest - fetch, summarize and question YouTube transcripts
//!
//! Transcripts come from the Supadata API. A pool of API keys is rotated
//! automatically when one is rate limited or rejected, see [`rotation`].
//! Summaries and answers are generated with Gemini.

pub mod cli;
pub mod config;
pub mod credentials;
pub mod digest;
pub mod output;
pub mod rotation;
pub mod summarize;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, KeysCommand, OutputFormat};
pub use config::Config;
pub use credentials::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use digest::{DigestPipeline, DigestResult};
pub use rotation::{CredentialRotator, RotationError, RotationState};
pub use transcript::{TranscriptError, TranscriptService};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
