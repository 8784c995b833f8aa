use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::config::StoreSettings;
use crate::error::SecretgateError;
use crate::store::{Backend, Result, SecretStore};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const STORE_FILE: &str = "secrets.store";

/// AES-256-GCM + Argon2id file store, for hosts without a native vault.
///
/// The whole map is one ciphertext: `nonce || AES-GCM(json)`. The salt lives in
/// `config.toml`, the password in an environment variable.
pub struct EncryptedFileStore {
    store_path: PathBuf,
    kdf_params: KdfParams,
    salt: Option<Vec<u8>>,
    password: Option<SecretString>,
    /// Serializes read-modify-write within this process. The map itself is
    /// re-read from disk on every call so writes from other processes are kept.
    lock: Mutex<()>,
}

#[derive(Clone, Debug)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65536, // 64 MB
            t_cost: 3,
            p_cost: 4,
        }
    }
}

impl EncryptedFileStore {
    pub fn new(
        store_path: PathBuf,
        kdf_params: KdfParams,
        salt: Option<Vec<u8>>,
        password: Option<SecretString>,
    ) -> Self {
        Self {
            store_path,
            kdf_params,
            salt,
            password,
            lock: Mutex::new(()),
        }
    }

    /// Salt from `[store].salt`, password from the variable named by
    /// `[store].password_env`. Either may be missing; the store then reports
    /// itself unavailable instead of failing here.
    pub fn from_settings(settings: &StoreSettings, state_dir: &Path) -> Result<Self> {
        let password = std::env::var(&settings.password_env)
            .ok()
            .filter(|p| !p.is_empty())
            .map(SecretString::new);
        Ok(Self::new(
            state_dir.join(STORE_FILE),
            settings.kdf_params(),
            settings.salt_bytes()?,
            password,
        ))
    }

    fn credentials(&self) -> Result<(&[u8], &SecretString)> {
        match (self.salt.as_deref(), self.password.as_ref()) {
            (Some(salt), Some(password)) => Ok((salt, password)),
            (None, _) => Err(SecretgateError::StoreUnavailable(
                "encrypted file store has no salt; run `secretgate init`".into(),
            )),
            (_, None) => Err(SecretgateError::StoreUnavailable(
                "encrypted file store password is not set".into(),
            )),
        }
    }

    /// Decrypt the store file. A missing file is an empty store.
    fn load(&self) -> Result<HashMap<String, String>> {
        let (salt, password) = self.credentials()?;

        if !self.store_path.exists() {
            return Ok(HashMap::new());
        }

        let ciphertext_with_nonce = std::fs::read(&self.store_path)?;
        if ciphertext_with_nonce.len() < NONCE_LEN {
            return Err(SecretgateError::CorruptStore(
                "Store file too short to contain a nonce.".into(),
            ));
        }

        let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);

        let mut key = derive_key(password.expose_secret().as_bytes(), salt, &self.kdf_params)?;

        let plaintext_result = {
            let cipher = Aes256Gcm::new_from_slice(&key)
                .map_err(|_| SecretgateError::CorruptStore("Invalid key length.".into()))?;
            cipher
                .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
                .map_err(|_| SecretgateError::DecryptionFailed)
        };

        key.zeroize();

        let mut plaintext = plaintext_result?;
        let parsed = serde_json::from_slice(&plaintext)
            .map_err(|e| SecretgateError::CorruptStore(e.to_string()));
        plaintext.zeroize();
        parsed
    }

    /// Encrypt `secrets` and write them atomically to disk.
    fn save(&self, secrets: &HashMap<String, String>) -> Result<()> {
        let (salt, password) = self.credentials()?;

        let mut json_bytes = serde_json::to_vec(secrets)
            .map_err(|e| SecretgateError::Serialization(e.to_string()))?;

        let mut key = derive_key(password.expose_secret().as_bytes(), salt, &self.kdf_params)?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext_result = {
            let cipher = Aes256Gcm::new_from_slice(&key)
                .map_err(|_| SecretgateError::CorruptStore("Invalid key length.".into()))?;
            cipher
                .encrypt(Nonce::from_slice(&nonce_bytes), json_bytes.as_ref())
                .map_err(|_| SecretgateError::CorruptStore("Encryption failed.".into()))
        };

        key.zeroize();
        json_bytes.zeroize();

        let ciphertext = ciphertext_result?;

        let parent = self
            .store_path
            .parent()
            .ok_or_else(|| SecretgateError::Config("Store has no parent directory.".into()))?;
        std::fs::create_dir_all(parent)?;

        // Atomic write: temp file, fsync, rename.
        let tmp_path = parent.join(format!(".store.tmp.{}", rand::random::<u64>()));
        {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            tmp.write_all(&nonce_bytes)?;
            tmp.write_all(&ciphertext)?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.store_path)?;
        Ok(())
    }

    /// Run `f` against a freshly decrypted copy of the file.
    fn with_secrets<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut secrets = self.load()?;
        let result = f(&mut secrets);
        secrets.values_mut().for_each(|v| v.zeroize());
        result
    }
}

impl SecretStore for EncryptedFileStore {
    fn backend(&self) -> Backend {
        Backend::EncryptedFile
    }

    fn is_available(&self) -> bool {
        self.credentials().is_ok()
    }

    fn get(&self, key: &str) -> Result<Option<SecretString>> {
        self.with_secrets(|secrets| Ok(secrets.get(key).map(|v| SecretString::new(v.clone()))))
    }

    fn set(&self, key: &str, value: SecretString) -> Result<()> {
        self.with_secrets(|secrets| {
            let previous = secrets.insert(key.to_string(), value.expose_secret().to_string());
            if let Some(mut old) = previous {
                old.zeroize();
            }
            self.save(secrets)
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_secrets(|secrets| match secrets.remove(key) {
            Some(mut old) => {
                old.zeroize();
                self.save(secrets)
            }
            None => Ok(()),
        })
    }
}

/// Derive a 32-byte AES key from the given password and salt using Argon2id.
/// The caller is responsible for zeroizing the returned array after use.
fn derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<[u8; KEY_LEN]> {
    let argon2_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(KEY_LEN))
        .map_err(|e| SecretgateError::Config(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| SecretgateError::Config(e.to_string()))?;

    Ok(key)
}
