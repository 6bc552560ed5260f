//! Credential rotation for the transcript API.
//!
//! [`CredentialRotator`] fetches a transcript with the active key. When the key
//! is rate limited or rejected it is marked degraded in the store and the next
//! healthy key in pool order is tried, at most once per key per call. Transport
//! failures rotate too but do not degrade the key. Any other failure is about
//! the request, not the key, and stops immediately.

use std::collections::HashSet;
use std::sync::Arc;

use crate::credentials::{Credential, CredentialStore, PoolSnapshot, PoolUpdate, StoreError};
use crate::transcript::{FailureClass, TranscriptError, TranscriptService};

/// Per-call bookkeeping, never persisted or shared between calls
#[derive(Debug, Clone, Default)]
pub struct RotationState {
    /// Number of failed attempts so far
    pub attempt: usize,

    /// Credential ids already sent upstream during this call
    pub tried: HashSet<String>,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    #[error("no transcript API keys configured")]
    NoCredentialsConfigured,

    #[error("all transcript API keys are rate limited or invalid ({attempts} attempt(s)){}", .last_failure.as_ref().map(|f| format!(": {}", f)).unwrap_or_default())]
    AllCredentialsExhausted {
        attempts: usize,
        last_failure: Option<String>,
    },

    #[error("transcript request failed: {message}")]
    TerminalUpstreamFailure {
        status: Option<u16>,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RotationError {
    /// True when the user should fix their key configuration rather than retry later
    pub fn needs_configuration(&self) -> bool {
        matches!(
            self,
            RotationError::NoCredentialsConfigured | RotationError::AllCredentialsExhausted { .. }
        )
    }
}

/// Pick the credential for the next attempt.
///
/// The active credential wins if it is healthy and untried. Otherwise the pool
/// is scanned in order starting just after the active position, wrapping once.
pub fn select_candidate<'a>(
    snapshot: &'a PoolSnapshot,
    tried: &HashSet<String>,
) -> Option<&'a Credential> {
    let usable = |c: &Credential| !c.degraded && !tried.contains(&c.id);

    if let Some(active) = snapshot.active() {
        if usable(active) {
            return Some(active);
        }
    }

    let len = snapshot.pool.len();
    let start = snapshot
        .active_id
        .as_deref()
        .and_then(|id| snapshot.position(id))
        .map(|pos| pos + 1)
        .unwrap_or(0);

    (0..len)
        .map(|offset| &snapshot.pool[(start + offset) % len])
        .find(|c| usable(*c))
}

/// Fetches transcripts, rotating through the key pool on credential failures
pub struct CredentialRotator {
    store: Arc<dyn CredentialStore>,
    service: Arc<dyn TranscriptService>,
}

impl CredentialRotator {
    pub fn new(store: Arc<dyn CredentialStore>, service: Arc<dyn TranscriptService>) -> Self {
        Self { store, service }
    }

    /// Fetch the transcript for `locator`, starting a fresh rotation
    pub async fn fetch_with_rotation(&self, locator: &str) -> Result<String, RotationError> {
        self.fetch_with_state(locator, RotationState::new()).await
    }

    /// Continue a rotation from an existing state
    pub async fn fetch_with_state(
        &self,
        locator: &str,
        mut state: RotationState,
    ) -> Result<String, RotationError> {
        let mut last_failure: Option<String> = None;

        loop {
            let snapshot = self.store.get().await?;

            if snapshot.pool.is_empty() {
                if state.attempt == 0 && state.tried.is_empty() {
                    return Err(RotationError::NoCredentialsConfigured);
                }
                return Err(RotationError::AllCredentialsExhausted {
                    attempts: state.attempt,
                    last_failure,
                });
            }

            let candidate = match select_candidate(&snapshot, &state.tried) {
                Some(candidate) => candidate.clone(),
                None => {
                    tracing::warn!(
                        "No usable transcript API key left after {} attempt(s)",
                        state.attempt
                    );
                    return Err(RotationError::AllCredentialsExhausted {
                        attempts: state.attempt,
                        last_failure,
                    });
                }
            };

            if snapshot.active_id.as_deref() != Some(candidate.id.as_str()) {
                tracing::info!("Switching active transcript API key to {}", candidate.label());
                self.store
                    .set(PoolUpdate::active(Some(candidate.id.clone())))
                    .await?;
            }

            state.tried.insert(candidate.id.clone());
            tracing::debug!(
                "Attempt {} using key {}",
                state.attempt + 1,
                candidate.label()
            );

            let err = match self.service.fetch_transcript(locator, &candidate.secret).await {
                Ok(text) => {
                    // Another call may have degraded this key meanwhile
                    if let Err(e) = self.set_degraded(&candidate.id, false).await {
                        tracing::warn!(
                            "Could not clear degraded flag on key {}: {}",
                            candidate.label(),
                            e
                        );
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            match err.class() {
                FailureClass::Terminal => {
                    tracing::error!("Transcript request failed: {}", err);
                    return Err(terminal(&err));
                }
                FailureClass::Retryable => {
                    tracing::warn!("Key {} failed, marking degraded: {}", candidate.label(), err);
                    self.set_degraded(&candidate.id, true).await?;
                }
                FailureClass::Transport => {
                    tracing::warn!("Transport failure with key {}: {}", candidate.label(), err);
                }
            }

            last_failure = Some(err.to_string());
            state.attempt += 1;

            if state.attempt >= snapshot.pool.len() {
                return Err(RotationError::AllCredentialsExhausted {
                    attempts: state.attempt,
                    last_failure,
                });
            }
        }
    }

    /// Write a credential's degraded flag if it differs from the stored value
    async fn set_degraded(&self, id: &str, degraded: bool) -> Result<(), RotationError> {
        let snapshot = self.store.get().await?;

        let Some(current) = snapshot.find(id) else {
            tracing::debug!("Key {} was removed during rotation", id);
            return Ok(());
        };
        if current.degraded == degraded {
            return Ok(());
        }

        let pool = snapshot
            .pool
            .into_iter()
            .map(|mut c| {
                if c.id == id {
                    c.degraded = degraded;
                }
                c
            })
            .collect();

        self.store.set(PoolUpdate::pool(pool)).await?;
        Ok(())
    }
}

fn terminal(err: &TranscriptError) -> RotationError {
    RotationError::TerminalUpstreamFailure {
        status: err.status(),
        message: err.detail(),
    }
}
