//! User secrets: values in the secret store, names in the journal.
//!
//! Every mutation writes the store first and the journal second. If the
//! journal write fails after the store write succeeded, the value exists but
//! is not listed; the next `set` for that name repairs the record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, SecretgateError};
use crate::journal::{self, UserSecret};
use crate::secret_ref::user_secret_ref;
use crate::store::StoreProvider;

/// Canonical names are non-empty and use only `A-Z`, `0-9` and `_`.
pub fn is_valid_secret_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

pub fn validate_secret_name(name: &str) -> Result<()> {
    if is_valid_secret_name(name) {
        Ok(())
    } else {
        Err(SecretgateError::InvalidSecret(format!(
            "name {:?} must be uppercase letters, digits and underscores only",
            name
        )))
    }
}

pub struct UserSecretsManager {
    stores: Arc<StoreProvider>,
    /// One lock per state directory; guards journal read-modify-write.
    journal_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl UserSecretsManager {
    pub fn new(stores: Arc<StoreProvider>) -> Self {
        Self {
            stores,
            journal_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn stores(&self) -> &StoreProvider {
        &self.stores
    }

    pub fn list(&self, state_dir: &Path) -> Result<Vec<UserSecret>> {
        journal::read(state_dir)
    }

    /// Store `value` under `name`, then record `name` in the journal with a
    /// fresh timestamp. Re-setting a name replaces its record in place.
    pub fn set(&self, name: &str, value: SecretString, state_dir: &Path) -> Result<()> {
        validate_secret_name(name)?;
        if value.expose_secret().is_empty() {
            return Err(SecretgateError::InvalidSecret("value must not be empty".into()));
        }

        let store = self.stores.get()?;
        store.set(&user_secret_ref(name), value)?;

        self.update_journal(state_dir, |secrets| {
            let entry = UserSecret::now(name);
            match secrets.iter_mut().find(|s| s.name == name) {
                Some(existing) => *existing = entry,
                None => secrets.push(entry),
            }
        })?;

        tracing::info!(name, backend = %store.backend(), "user secret set");
        Ok(())
    }

    /// Remove `name` from the store and the journal. Absent names are a no-op.
    pub fn delete(&self, name: &str, state_dir: &Path) -> Result<()> {
        validate_secret_name(name)?;

        let store = self.stores.get()?;
        store.delete(&user_secret_ref(name))?;

        self.update_journal(state_dir, |secrets| secrets.retain(|s| s.name != name))?;

        tracing::info!(name, backend = %store.backend(), "user secret deleted");
        Ok(())
    }

    /// Read a value straight from the store. The journal is not consulted.
    pub fn get_value(&self, name: &str) -> Result<Option<SecretString>> {
        validate_secret_name(name)?;
        let store = self.stores.get()?;
        store.get(&user_secret_ref(name))
    }

    fn update_journal(
        &self,
        state_dir: &Path,
        mutate: impl FnOnce(&mut Vec<UserSecret>),
    ) -> Result<()> {
        let lock = self.journal_lock(state_dir);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut secrets = journal::read(state_dir)?;
        mutate(&mut secrets);
        journal::write(state_dir, &secrets)
    }

    fn journal_lock(&self, state_dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.journal_locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(state_dir.to_path_buf()).or_default())
    }
}
