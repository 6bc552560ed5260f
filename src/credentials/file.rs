use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{CredentialStore, PoolSnapshot, PoolUpdate, StoreError};

/// JSON file backed credential store.
///
/// Every `set` is a whole-document read-modify-write. There is no locking
/// across processes; concurrent writers may lose each other's updates.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config_dir>/tubedigest/credentials.json`
    pub fn new_default() -> Result<Self, StoreError> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .ok_or_else(|| StoreError::Unavailable("no config directory".to_string()))?;

        Ok(Self::new(base.join("tubedigest").join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_snapshot(&self) -> Result<PoolSnapshot, StoreError> {
        if !self.path.exists() {
            return Ok(PoolSnapshot::default());
        }

        let content = fs_err::read_to_string(&self.path)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if content.trim().is_empty() {
            return Ok(PoolSnapshot::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| StoreError::Unavailable(format!("corrupt {}: {}", self.path.display(), e)))
    }

    /// Write to a private temp file beside the target, then rename it over
    fn write_snapshot(&self, snapshot: &PoolSnapshot) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs_err::create_dir_all(dir).map_err(|e| StoreError::Persist(e.to_string()))?;

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StoreError::Persist(format!("serde: {}", e)))?;

        // Created 0600 on unix
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| StoreError::Persist(format!("temp file in {}: {}", dir.display(), e)))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StoreError::Persist(e.to_string()))?;
        tmp.persist(&self.path).map_err(|e| {
            StoreError::Persist(format!("rename to {}: {}", self.path.display(), e.error))
        })?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<PoolSnapshot, StoreError> {
        self.read_snapshot()
    }

    async fn set(&self, update: PoolUpdate) -> Result<(), StoreError> {
        let mut snapshot = self.read_snapshot()?;
        snapshot.apply(update);
        tracing::debug!(
            "Persisting {} credential(s) to {}",
            snapshot.pool.len(),
            self.path.display()
        );
        self.write_snapshot(&snapshot)
    }
}
