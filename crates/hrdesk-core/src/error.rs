use thiserror::Error;

/// Failures raised by a [`StorageArea`](crate::store::StorageArea).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the static-secret cipher.
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed")]
    Encrypt,

    #[error("Decryption failed - wrong secret or tampered ciphertext")]
    Decrypt,

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Ciphertext too short: {0} bytes")]
    Truncated(usize),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Failures of the encrypted store. `get` collapses all of these to `None`;
/// `try_get` and `set` surface them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No session secret configured")]
    MissingSecret,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored value is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Programming errors in how the session API is reached.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum UsageError {
    #[error("Session accessed outside of a provided SessionScope")]
    OutsideScope,
}
