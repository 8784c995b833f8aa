//! OS keychain backend.
//!
//! Uses the `keyring` crate, which maps to Keychain Services on macOS,
//! Credential Manager on Windows and the Secret Service (GNOME Keyring,
//! KWallet) on Linux. Each SecretRef becomes the account of one entry under
//! a fixed service name.

use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};

use crate::error::SecretgateError;
use crate::store::{Backend, Result, SecretStore};

/// Account used only to check whether the vault answers at all.
const PROBE_ACCOUNT: &str = "__secretgate_probe__";

pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(map_keyring_error)
    }
}

impl SecretStore for KeychainStore {
    fn backend(&self) -> Backend {
        Backend::Keychain
    }

    /// A lookup of a throwaway account either finds nothing or finds
    /// something; both mean the vault is reachable.
    fn is_available(&self) -> bool {
        let entry = match Entry::new(&self.service, PROBE_ACCOUNT) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "keychain entry could not be created");
                return false;
            }
        };
        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                tracing::debug!(error = %e, "keychain probe failed");
                false
            }
        }
    }

    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(SecretString::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn set(&self, key: &str, value: SecretString) -> Result<()> {
        self.entry(key)?
            .set_password(value.expose_secret())
            .map_err(map_keyring_error)
    }

    fn delete(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_keyring_error(e)),
        }
    }
}

/// Locked vaults and missing daemons are environmental; everything else is
/// a backend error.
fn map_keyring_error(err: keyring::Error) -> SecretgateError {
    match err {
        keyring::Error::NoStorageAccess(e) => {
            SecretgateError::StoreUnavailable(format!("keychain not accessible: {}", e))
        }
        keyring::Error::PlatformFailure(e) => {
            SecretgateError::StoreUnavailable(format!("keychain platform failure: {}", e))
        }
        other => SecretgateError::Backend(other.to_string()),
    }
}
