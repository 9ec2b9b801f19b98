//! Application configuration management.
//!
//! The only setting most users need is the identity service base URL,
//! normally supplied through the `AUTHDASH_API_URL` environment variable.
//! Optional overrides live at `~/.config/authdash/config.json`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore};

/// Application name used for config directory paths
const APP_NAME: &str = "authdash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable holding the identity service base URL
pub const API_URL_ENV: &str = "AUTHDASH_API_URL";

/// Local development backend
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Where the session token is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub credential_backend: CredentialBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Base URL: environment first, then the config file, then the
    /// local development default.
    pub fn api_base_url(&self) -> String {
        self.resolve_base_url(std::env::var(API_URL_ENV).ok())
    }

    fn resolve_base_url(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone().filter(|v| !v.trim().is_empty()))
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Credential store for the configured backend, scoped to `base_url`
    pub fn credential_store(&self, base_url: &str) -> Result<Arc<dyn CredentialStore>> {
        debug!(backend = ?self.credential_backend, "Opening credential store");
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileCredentialStore::for_origin(base_url)?),
            CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::for_origin(base_url)),
            CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            api_base_url: Some("https://auth.example.com/".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_base_url(Some("http://127.0.0.1:9000".to_string())),
            "http://127.0.0.1:9000"
        );
        assert_eq!(config.resolve_base_url(None), "https://auth.example.com");
        assert_eq!(config.resolve_base_url(Some("  ".to_string())), "https://auth.example.com");

        assert_eq!(Config::default().resolve_base_url(None), DEFAULT_API_URL);
    }

    #[test]
    fn test_parse_config_file() {
        let config: Config =
            serde_json::from_str(r#"{"api_base_url":"http://x:1","credential_backend":"keyring"}"#).unwrap();
        assert_eq!(config.api_base_url.as_deref(), Some("http://x:1"));
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);

        // Older files without a backend fall back to the file store
        let config: Config = serde_json::from_str(r#"{"api_base_url":null}"#).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_memory_backend_store() {
        let config = Config {
            credential_backend: CredentialBackend::Memory,
            ..Config::default()
        };
        let store = config.credential_store(DEFAULT_API_URL).unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
