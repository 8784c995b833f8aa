pub mod encrypted_file;
pub mod keychain;
pub mod memory;

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::config::StoreSettings;
use crate::error::{Result, SecretgateError};

pub use encrypted_file::EncryptedFileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// Core abstraction for secret storage. The manager interacts only with this trait.
///
/// Values are addressed by SecretRef strings, never by the human-facing name.
pub trait SecretStore: Send + Sync {
    fn backend(&self) -> Backend;

    /// Whether this backend is usable on the current host.
    fn is_available(&self) -> bool;

    fn get(&self, key: &str) -> Result<Option<SecretString>>;

    fn set(&self, key: &str, value: SecretString) -> Result<()>;

    /// Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Keychain,
    EncryptedFile,
    Memory,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Keychain => "keychain",
            Backend::EncryptedFile => "encrypted-file",
            Backend::Memory => "memory",
        };
        f.write_str(name)
    }
}

/// Which backend(s) the provider may pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
    /// Native vault first, then the encrypted file.
    #[default]
    Auto,
    Keychain,
    EncryptedFile,
    Memory,
}

/// Probes candidate backends in priority order and caches the first
/// available one until [`StoreProvider::reset`] is called.
pub struct StoreProvider {
    candidates: Vec<Arc<dyn SecretStore>>,
    cached: Mutex<Option<Arc<dyn SecretStore>>>,
}

impl StoreProvider {
    pub fn new(candidates: Vec<Arc<dyn SecretStore>>) -> Self {
        Self {
            candidates,
            cached: Mutex::new(None),
        }
    }

    /// A provider that always hands out `store`.
    pub fn fixed(store: Arc<dyn SecretStore>) -> Self {
        Self::new(vec![store])
    }

    /// Build the candidate list described by the `[store]` config section.
    pub fn from_settings(settings: &StoreSettings, state_dir: &Path) -> Result<Self> {
        let keychain = || -> Arc<dyn SecretStore> {
            Arc::new(KeychainStore::new(&settings.keychain_service))
        };
        let encrypted = || -> Result<Arc<dyn SecretStore>> {
            Ok(Arc::new(EncryptedFileStore::from_settings(settings, state_dir)?))
        };

        let candidates = match settings.backend {
            BackendChoice::Auto => vec![keychain(), encrypted()?],
            BackendChoice::Keychain => vec![keychain()],
            BackendChoice::EncryptedFile => vec![encrypted()?],
            BackendChoice::Memory => vec![Arc::new(MemoryStore::new()) as Arc<dyn SecretStore>],
        };
        Ok(Self::new(candidates))
    }

    /// Return the cached backend, probing candidates on first use.
    ///
    /// Fails with `StoreUnavailable` when no candidate is usable. That outcome
    /// is not cached, so a vault unlocked later is picked up on the next call.
    pub fn get(&self) -> Result<Arc<dyn SecretStore>> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = cached.as_ref() {
            return Ok(Arc::clone(store));
        }

        for candidate in &self.candidates {
            if candidate.is_available() {
                tracing::info!(backend = %candidate.backend(), "secret store backend selected");
                *cached = Some(Arc::clone(candidate));
                return Ok(Arc::clone(candidate));
            }
            tracing::debug!(backend = %candidate.backend(), "secret store backend not available");
        }

        let tried: Vec<String> = self
            .candidates
            .iter()
            .map(|c| c.backend().to_string())
            .collect();
        tracing::warn!(tried = ?tried, "no secret store backend available");
        Err(SecretgateError::StoreUnavailable(format!(
            "no usable backend (tried: {})",
            if tried.is_empty() {
                "none".to_string()
            } else {
                tried.join(", ")
            }
        )))
    }

    /// Drop the cached backend so the next `get` probes again.
    pub fn reset(&self) {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        *cached = None;
    }

    /// Candidate backends in probe order. Does not probe.
    pub fn backends(&self) -> Vec<Backend> {
        self.candidates.iter().map(|c| c.backend()).collect()
    }

    pub fn selected(&self) -> Option<Backend> {
        let cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        cached.as_ref().map(|s| s.backend())
    }
}
