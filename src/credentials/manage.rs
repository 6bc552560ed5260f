//! Pool management used by the `keys` command.

use std::io::BufRead;

use anyhow::Context;

use super::{Credential, CredentialStore, PoolUpdate};
use crate::Result;

/// Mask a secret for display, keeping the first and last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        secret.to_string()
    }
}

/// Read a key value from the first non-blank line of `reader`
pub fn read_secret(reader: impl BufRead) -> Result<String> {
    for line in reader.lines() {
        let line = line.context("Failed to read API key from stdin")?;
        let secret = line.trim();
        if !secret.is_empty() {
            return Ok(secret.to_string());
        }
    }
    anyhow::bail!("No API key given. Pass it as an argument, set TUBEDIGEST_NEW_KEY or pipe it on stdin")
}

/// Add a key to the pool. It becomes active when nothing else is.
pub async fn add_credential(
    store: &dyn CredentialStore,
    secret: &str,
    display_name: Option<String>,
) -> Result<Credential> {
    let secret = secret.trim();
    if secret.is_empty() {
        anyhow::bail!("API key value cannot be empty");
    }

    let display_name = display_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let mut snapshot = store.get().await.context("Failed to read credential pool")?;
    if snapshot.pool.iter().any(|c| c.secret == secret) {
        anyhow::bail!("This API key is already in the pool");
    }

    let credential = Credential::new(secret, display_name);
    snapshot.pool.push(credential.clone());

    let active_id = match snapshot.active() {
        Some(active) => Some(active.id.clone()),
        None => Some(credential.id.clone()),
    };

    store
        .set(PoolUpdate::both(snapshot.pool, active_id))
        .await
        .context("Failed to save credential pool")?;

    tracing::info!("Added API key {}", credential.label());
    Ok(credential)
}

/// Remove a key. If it was active, the first remaining key takes over.
pub async fn remove_credential(store: &dyn CredentialStore, id: &str) -> Result<Credential> {
    let snapshot = store.get().await.context("Failed to read credential pool")?;

    let removed = snapshot
        .find(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("No API key with id {}", id))?;

    let remaining: Vec<Credential> = snapshot
        .pool
        .iter()
        .filter(|c| c.id != id)
        .cloned()
        .collect();

    let active_id = if snapshot.active_id.as_deref() == Some(id) {
        remaining.first().map(|c| c.id.clone())
    } else {
        snapshot.active_id.clone()
    };

    store
        .set(PoolUpdate::both(remaining, active_id))
        .await
        .context("Failed to save credential pool")?;

    tracing::info!("Removed API key {}", removed.label());
    Ok(removed)
}

/// Make a key active. An explicit choice also clears its degraded flag.
pub async fn activate_credential(store: &dyn CredentialStore, id: &str) -> Result<()> {
    let snapshot = store.get().await.context("Failed to read credential pool")?;

    if snapshot.find(id).is_none() {
        anyhow::bail!("No API key with id {}", id);
    }

    let pool = snapshot
        .pool
        .into_iter()
        .map(|mut c| {
            if c.id == id {
                c.degraded = false;
            }
            c
        })
        .collect();

    store
        .set(PoolUpdate::both(pool, Some(id.to_string())))
        .await
        .context("Failed to save credential pool")?;

    Ok(())
}

/// Clear every degraded flag, returning how many were set
pub async fn reset_degraded(store: &dyn CredentialStore) -> Result<usize> {
    let snapshot = store.get().await.context("Failed to read credential pool")?;
    let cleared = snapshot.pool.iter().filter(|c| c.degraded).count();

    if cleared > 0 {
        let pool = snapshot
            .pool
            .into_iter()
            .map(|mut c| {
                c.degraded = false;
                c
            })
            .collect();
        store
            .set(PoolUpdate::pool(pool))
            .await
            .context("Failed to save credential pool")?;
    }

    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcd...ijkl");
        assert_eq!(mask_secret("short"), "short");
        assert_eq!(mask_secret("12345678"), "12345678");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_read_secret_skips_blank_lines() {
        let input = std::io::Cursor::new("\n   \n  sd_piped_key  \nignored\n");
        assert_eq!(read_secret(input).unwrap(), "sd_piped_key");

        assert_err!(read_secret(std::io::Cursor::new("")));
        assert_err!(read_secret(std::io::Cursor::new("\n \n")));
    }

    #[tokio::test]
    async fn test_first_key_becomes_active() {
        let store = MemoryCredentialStore::new();
        let first = assert_ok!(add_credential(&store, "key-one-0000", None).await);
        let second = assert_ok!(add_credential(&store, "key-two-0000", Some("  ".into())).await);

        let snapshot = store.get().await.unwrap();
        assert_eq!(snapshot.active_id, Some(first.id));
        assert_eq!(snapshot.pool.len(), 2);
        assert!(second.display_name.is_none());
    }

    #[tokio::test]
    async fn test_add_rejects_empty_and_duplicate() {
        let store = MemoryCredentialStore::new();
        assert_err!(add_credential(&store, "   ", None).await);
        assert_ok!(add_credential(&store, "key-one-0000", None).await);
        assert_err!(add_credential(&store, " key-one-0000 ", None).await);
    }

    #[tokio::test]
    async fn test_add_repairs_dangling_active_pointer() {
        let store = MemoryCredentialStore::new();
        store.set(PoolUpdate::active(Some("gone".into()))).await.unwrap();

        let cred = assert_ok!(add_credential(&store, "key-one-0000", None).await);
        assert_eq!(store.get().await.unwrap().active_id, Some(cred.id));
    }

    #[tokio::test]
    async fn test_removing_active_key_promotes_first_remaining() {
        let store = MemoryCredentialStore::new();
        let a = add_credential(&store, "key-a-000000", None).await.unwrap();
        let b = add_credential(&store, "key-b-000000", None).await.unwrap();
        let c = add_credential(&store, "key-c-000000", None).await.unwrap();

        activate_credential(&store, &c.id).await.unwrap();
        remove_credential(&store, &c.id).await.unwrap();
        assert_eq!(store.get().await.unwrap().active_id, Some(a.id.clone()));

        // removing a non-active key keeps the pointer
        remove_credential(&store, &b.id).await.unwrap();
        assert_eq!(store.get().await.unwrap().active_id, Some(a.id.clone()));

        remove_credential(&store, &a.id).await.unwrap();
        let snapshot = store.get().await.unwrap();
        assert!(snapshot.pool.is_empty());
        assert!(snapshot.active_id.is_none());

        assert_err!(remove_credential(&store, &a.id).await);
    }

    #[tokio::test]
    async fn test_activate_clears_degraded() {
        let store = MemoryCredentialStore::new();
        add_credential(&store, "key-a-000000", None).await.unwrap();
        let b = add_credential(&store, "key-b-000000", None).await.unwrap();

        let mut pool = store.get().await.unwrap().pool;
        pool[1].degraded = true;
        store.set(PoolUpdate::pool(pool)).await.unwrap();

        activate_credential(&store, &b.id).await.unwrap();
        let snapshot = store.get().await.unwrap();
        assert_eq!(snapshot.active_id, Some(b.id.clone()));
        assert!(!snapshot.find(&b.id).unwrap().degraded);

        assert_err!(activate_credential(&store, "missing").await);
    }

    #[tokio::test]
    async fn test_reset_degraded_counts_flags() {
        let store = MemoryCredentialStore::new();
        add_credential(&store, "key-a-000000", None).await.unwrap();
        add_credential(&store, "key-b-000000", None).await.unwrap();

        let mut pool = store.get().await.unwrap().pool;
        pool.iter_mut().for_each(|c| c.degraded = true);
        store.set(PoolUpdate::pool(pool)).await.unwrap();

        assert_eq!(reset_degraded(&store).await.unwrap(), 2);
        assert_eq!(reset_degraded(&store).await.unwrap(), 0);
        assert!(store.get().await.unwrap().pool.iter().all(|c| !c.degraded));
    }
}
