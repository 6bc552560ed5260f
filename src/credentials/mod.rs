use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub mod file;
pub mod manage;

pub use file::FileCredentialStore;
pub use manage::{
    activate_credential, add_credential, mask_secret, read_secret, remove_credential,
    reset_degraded,
};

/// A single transcript API key plus its health bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Stable unique identifier
    pub id: String,

    /// Value sent to the transcript service
    pub secret: String,

    /// Optional human label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Set when the most recent use failed with a retryable error
    #[serde(default)]
    pub degraded: bool,

    /// When the key was added to the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(secret: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            secret: secret.into(),
            display_name,
            degraded: false,
            added_at: Some(Utc::now()),
        }
    }

    /// Label for logs and listings; never exposes the full secret
    pub fn label(&self) -> String {
        match &self.display_name {
            Some(name) => format!("{} ({})", name, mask_secret(&self.secret)),
            None => mask_secret(&self.secret),
        }
    }
}

/// Persisted pool state as read from a [`CredentialStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    #[serde(default)]
    pub pool: Vec<Credential>,

    #[serde(default)]
    pub active_id: Option<String>,
}

impl PoolSnapshot {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.pool.iter().position(|c| c.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Credential> {
        self.pool.iter().find(|c| c.id == id)
    }

    pub fn active(&self) -> Option<&Credential> {
        self.active_id.as_deref().and_then(|id| self.find(id))
    }

    /// Merge a partial update into this snapshot
    pub fn apply(&mut self, update: PoolUpdate) {
        if let Some(pool) = update.pool {
            self.pool = pool;
        }
        if let Some(active_id) = update.active_id {
            self.active_id = active_id;
        }
    }
}

/// Partial update; `None` fields leave stored state untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolUpdate {
    pub pool: Option<Vec<Credential>>,
    pub active_id: Option<Option<String>>,
}

impl PoolUpdate {
    pub fn pool(pool: Vec<Credential>) -> Self {
        Self {
            pool: Some(pool),
            active_id: None,
        }
    }

    pub fn active(active_id: Option<String>) -> Self {
        Self {
            pool: None,
            active_id: Some(active_id),
        }
    }

    pub fn both(pool: Vec<Credential>, active_id: Option<String>) -> Self {
        Self {
            pool: Some(pool),
            active_id: Some(active_id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to persist credentials: {0}")]
    Persist(String),
}

/// Durable storage for the credential pool and the active pointer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the pool and the active credential id
    async fn get(&self) -> Result<PoolSnapshot, StoreError>;

    /// Merge a partial update into stored state
    async fn set(&self, update: PoolUpdate) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and by callers that manage persistence themselves
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: Mutex<PoolSnapshot>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: PoolSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<PoolSnapshot, StoreError> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    async fn set(&self, update: PoolUpdate) -> Result<(), StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))?
            .apply(update);
        Ok(())
    }
}
