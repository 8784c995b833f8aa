use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SecretgateError};
use crate::store::encrypted_file::KdfParams;
use crate::store::BackendChoice;

const STATE_DIR: &str = ".secretgate";
const CONFIG_FILE: &str = "config.toml";

/// Overrides the default `<cwd>/.secretgate` state directory.
pub const STATE_DIR_ENV: &str = "SECRETGATE_STATE_DIR";

const DEFAULT_KEYCHAIN_SERVICE: &str = "secretgate";
const DEFAULT_PASSWORD_ENV: &str = "SECRETGATE_STORE_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, McpServerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: BackendChoice,
    pub keychain_service: String,
    /// Name of the environment variable holding the encrypted-file password.
    pub password_env: String,
    pub kdf: String,
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
    /// Hex-encoded 32-byte salt for Argon2id. Written by `secretgate init`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        let kdf = KdfParams::default();
        Self {
            backend: BackendChoice::Auto,
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.into(),
            password_env: DEFAULT_PASSWORD_ENV.into(),
            kdf: "argon2id".into(),
            m_cost: kdf.m_cost,
            t_cost: kdf.t_cost,
            p_cost: kdf.p_cost,
            salt: None,
        }
    }
}

impl StoreSettings {
    pub fn with_salt(salt_hex: String) -> Self {
        Self {
            salt: Some(salt_hex),
            ..Self::default()
        }
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            m_cost: self.m_cost,
            t_cost: self.t_cost,
            p_cost: self.p_cost,
        }
    }

    pub fn salt_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.salt
            .as_deref()
            .map(|salt| {
                hex::decode(salt)
                    .map_err(|_| SecretgateError::Config("Invalid salt hex in config.toml".into()))
            })
            .transpose()
    }
}

/// Source of the gateway configuration. Handlers load through this on every
/// call so edits to `config.toml` are picked up without a restart.
pub trait ConfigLoader: Send + Sync {
    fn load(&self) -> Result<GatewayConfig>;
}

impl<F> ConfigLoader for F
where
    F: Fn() -> Result<GatewayConfig> + Send + Sync,
{
    fn load(&self) -> Result<GatewayConfig> {
        self()
    }
}

pub struct FileConfigLoader {
    state_dir: PathBuf,
}

impl FileConfigLoader {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<GatewayConfig> {
        read(&self.state_dir)
    }
}

/// Resolve the state directory: explicit override, then `SECRETGATE_STATE_DIR`,
/// then `.secretgate` under the current directory.
pub fn state_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    Ok(std::env::current_dir()?.join(STATE_DIR))
}

/// Returns the config file path for a given state directory.
pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE)
}

/// Read and parse `config.toml`. A missing file yields the default config.
pub fn read(state_dir: &Path) -> Result<GatewayConfig> {
    match read_raw(state_dir)? {
        Some(raw) => toml::from_str(&raw).map_err(|e| SecretgateError::Config(e.to_string())),
        None => Ok(GatewayConfig::default()),
    }
}

/// Only the `[store]` table. Other tables are not validated here, so a bad
/// `[mcpServers]` entry cannot keep the secret store from opening.
pub fn read_store_settings(state_dir: &Path) -> Result<StoreSettings> {
    #[derive(Deserialize)]
    struct StoreSection {
        #[serde(default)]
        store: StoreSettings,
    }

    match read_raw(state_dir)? {
        Some(raw) => toml::from_str::<StoreSection>(&raw)
            .map(|section| section.store)
            .map_err(|e| SecretgateError::Config(e.to_string())),
        None => Ok(StoreSettings::default()),
    }
}

fn read_raw(state_dir: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(config_path(state_dir)) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `config.toml`, creating the state directory if needed.
pub fn write(state_dir: &Path, config: &GatewayConfig) -> Result<()> {
    std::fs::create_dir_all(state_dir)?;
    let raw = toml::to_string(config).map_err(|e| SecretgateError::Config(e.to_string()))?;
    std::fs::write(config_path(state_dir), raw)?;
    Ok(())
}
