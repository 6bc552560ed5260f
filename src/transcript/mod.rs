use async_trait::async_trait;

pub mod supadata;

pub use supadata::SupadataClient;

/// Why the upstream rejected a request, derived from status and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamReason {
    RateLimited,
    Unauthorized,
    QuotaExceeded,
    NotFound,
    Other,
}

impl UpstreamReason {
    /// Status code decides first; the body message is only a fallback hint
    pub fn classify(status: u16, message: Option<&str>) -> Self {
        match status {
            429 => return UpstreamReason::RateLimited,
            401 | 403 => return UpstreamReason::Unauthorized,
            _ => {}
        }

        if let Some(message) = message {
            let message = message.to_lowercase();
            if message.contains("rate limit") || message.contains("too many requests") {
                return UpstreamReason::RateLimited;
            }
            if message.contains("quota") {
                return UpstreamReason::QuotaExceeded;
            }
            if message.contains("invalid api key")
                || message.contains("api key not valid")
                || message.contains("invalid key")
            {
                return UpstreamReason::Unauthorized;
            }
        }

        if status == 404 {
            UpstreamReason::NotFound
        } else {
            UpstreamReason::Other
        }
    }

    /// Whether the failure is attributable to the credential rather than the request
    pub fn is_credential_fault(&self) -> bool {
        matches!(
            self,
            UpstreamReason::RateLimited | UpstreamReason::Unauthorized | UpstreamReason::QuotaExceeded
        )
    }

    fn describe(&self) -> &'static str {
        match self {
            UpstreamReason::RateLimited => "rate limit exceeded",
            UpstreamReason::Unauthorized => "invalid API key",
            UpstreamReason::QuotaExceeded => "quota exceeded",
            UpstreamReason::NotFound => "transcript not found for this video",
            UpstreamReason::Other => "request rejected",
        }
    }
}

/// How the rotator should react to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Credential is at fault: mark it degraded and rotate
    Retryable,
    /// No response at all: rotate without blaming the credential
    Transport,
    /// The request itself failed: stop
    Terminal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcript API returned {status}: {}", upstream_detail(.reason, .message))]
    Upstream {
        status: u16,
        reason: UpstreamReason,
        message: Option<String>,
    },

    #[error("unexpected transcript API response: {0}")]
    MalformedResponse(String),

    #[error("transcript API unreachable: {0}")]
    Transport(String),
}

fn upstream_detail(reason: &UpstreamReason, message: &Option<String>) -> String {
    message
        .clone()
        .unwrap_or_else(|| reason.describe().to_string())
}

impl TranscriptError {
    /// Build an upstream error, classifying it from its structured parts
    pub fn upstream(status: u16, message: Option<String>) -> Self {
        let reason = UpstreamReason::classify(status, message.as_deref());
        TranscriptError::Upstream {
            status,
            reason,
            message,
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            TranscriptError::Upstream { reason, .. } if reason.is_credential_fault() => {
                FailureClass::Retryable
            }
            TranscriptError::Upstream { .. } | TranscriptError::MalformedResponse(_) => {
                FailureClass::Terminal
            }
            TranscriptError::Transport(_) => FailureClass::Transport,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TranscriptError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human readable detail without the status prefix
    pub fn detail(&self) -> String {
        match self {
            TranscriptError::Upstream {
                reason, message, ..
            } => upstream_detail(reason, message),
            TranscriptError::MalformedResponse(detail) | TranscriptError::Transport(detail) => {
                detail.clone()
            }
        }
    }
}

/// Remote endpoint that turns a video locator into transcript text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// Fetch the transcript for `locator` authenticating with `secret`
    async fn fetch_transcript(&self, locator: &str, secret: &str)
        -> Result<String, TranscriptError>;
}
