use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretgateError {
    #[error("Secret store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Secret store backend error: {0}")]
    Backend(String),

    #[error("Wrong secret store password, or store is corrupted.")]
    DecryptionFailed,

    #[error("Store is corrupted: {0}")]
    CorruptStore(String),

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, SecretgateError>;
