//! Single-slot storage for the session's bearer token.
//!
//! Every backend holds at most one token per origin. Writing a token fully
//! replaces the previous one; clearing an empty slot is a no-op.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use parking_lot::Mutex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SERVICE_NAME: &str = "authdash";

/// Token file name inside the per-origin directory
const TOKEN_FILE: &str = "token.json";

/// Durable home for the bearer token.
///
/// The session manager is the only writer; the HTTP transport only reads.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<String>>;
    fn put(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Filesystem-safe key identifying the origin a token belongs to,
/// e.g. `http_localhost_8080`.
pub fn origin_key(base_url: &str) -> String {
    let raw = match Url::parse(base_url) {
        Ok(url) => format!(
            "{}_{}_{}",
            url.scheme(),
            url.host_str().unwrap_or("local"),
            url.port_or_known_default().unwrap_or(0)
        ),
        Err(_) => base_url.to_string(),
    };
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

// ============================================================================
// File backend
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    stored_at: DateTime<Utc>,
}

/// Token persisted as JSON under a per-origin directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store rooted at an explicit directory, scoped to `base_url`'s origin
    pub fn new(root: &Path, base_url: &str) -> Self {
        Self {
            path: root.join(origin_key(base_url)).join(TOKEN_FILE),
        }
    }

    /// Store under the platform data directory
    pub fn for_origin(base_url: &str) -> Result<Self> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(Self::new(&data_dir.join(SERVICE_NAME), base_url))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the current token was written, if any
    pub fn stored_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.read()?.map(|stored| stored.stored_at))
    }

    fn read(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read token file")?;
        let stored: StoredToken = serde_json::from_str(&contents)
            .context("Failed to parse token file")?;
        Ok(Some(stored))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.read()?.map(|stored| stored.token))
    }

    fn put(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create token directory")?;
        }
        let stored = StoredToken {
            token: token.to_string(),
            stored_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, contents).context("Failed to write token file")?;
        restrict_permissions(&self.path)?;
        debug!(path = ?self.path, "Token written");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove token file")?;
            debug!(path = ?self.path, "Token removed");
        }
        Ok(())
    }
}

/// Owner read/write only: the file holds a live bearer token
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .context("Failed to restrict token file permissions")
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// ============================================================================
// OS keychain backend
// ============================================================================

/// Token kept in the OS keychain, one entry per origin.
pub struct KeyringCredentialStore {
    account: String,
}

impl KeyringCredentialStore {
    pub fn for_origin(base_url: &str) -> Self {
        Self {
            account: origin_key(base_url),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn put(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local slot. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn put(&self, token: &str) -> Result<()> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_key() {
        assert_eq!(origin_key("http://localhost:8080"), "http_localhost_8080");
        assert_eq!(origin_key("https://auth.example.com/"), "https_auth.example.com_443");
        assert_eq!(origin_key("http://example.com/api/v1"), "http_example.com_80");
        assert_eq!(origin_key("not a url"), "not_a_url");
    }

    #[test]
    fn test_memory_store_single_slot() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.get().unwrap(), None);

        store.put("first").unwrap();
        store.put("second").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("second"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileCredentialStore::new(dir.path(), "http://localhost:8080");
        assert_eq!(store.get().unwrap(), None);
        store.put("T").unwrap();
        assert!(store.stored_at().unwrap().is_some());

        // A fresh handle on the same origin sees the token, as after a restart
        let reopened = FileCredentialStore::new(dir.path(), "http://localhost:8080/");
        assert_eq!(reopened.get().unwrap().as_deref(), Some("T"));

        reopened.put("U").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("U"));

        reopened.clear().unwrap();
        reopened.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "http://localhost:8080");
        store.put("T").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // Loosened by hand, tightened again on the next write
        std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        store.put("U").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_is_origin_scoped() {
        let dir = tempfile::tempdir().unwrap();

        let local = FileCredentialStore::new(dir.path(), "http://localhost:8080");
        let prod = FileCredentialStore::new(dir.path(), "https://auth.example.com");

        local.put("local-token").unwrap();
        assert_eq!(prod.get().unwrap(), None);

        prod.put("prod-token").unwrap();
        local.clear().unwrap();
        assert_eq!(prod.get().unwrap().as_deref(), Some("prod-token"));
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path(), "http://localhost:8080");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(store.get().is_err());
        // Clearing still recovers the slot
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
