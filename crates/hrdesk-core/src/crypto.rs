//! Static-secret symmetric cipher for values held at rest.
//!
//! The key is derived once from the application secret with Argon2id and a
//! fixed salt; each write uses a fresh random XChaCha20-Poly1305 nonce. The
//! text form is `base64(nonce || sealed)`.
//!
//! Anyone who can read the storage area can also read the shipped secret, so
//! this keeps stored values away from casual inspection only.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::CipherError;

/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;

/// XChaCha20 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Poly1305 tag length in bytes.
const TAG_LEN: usize = 16;

/// Fixed salt; the secret is application-wide, not per user.
const KEY_SALT: &[u8] = b"hrdesk.session-store.v1";

/// Argon2 cost parameters (memory KiB, iterations, lanes).
const KDF_MEMORY_KIB: u32 = 4096;
const KDF_ITERATIONS: u32 = 1;
const KDF_LANES: u32 = 1;

#[derive(Clone)]
pub struct StaticCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for StaticCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCipher").field("key", &"<redacted>").finish()
    }
}

impl StaticCipher {
    /// Derive the cipher key from the application secret.
    pub fn from_secret(secret: &str) -> Result<Self, CipherError> {
        let params = Params::new(KDF_MEMORY_KIB, KDF_ITERATIONS, KDF_LANES, Some(KEY_LEN))
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = [0u8; KEY_LEN];
        argon2
            .hash_password_into(secret.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;

        Ok(Self { key })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CipherError> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, text: &str) -> Result<Vec<u8>, CipherError> {
        let raw = STANDARD.decode(text.trim())?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Truncated(raw.len()));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.key));
        cipher
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_recovers_plaintext() {
        let cipher = StaticCipher::from_secret("app-secret").unwrap();
        let text = cipher.encrypt(b"{\"id\":42}").unwrap();
        assert_eq!(cipher.decrypt(&text).unwrap(), b"{\"id\":42}");
    }

    #[test]
    fn test_same_plaintext_encrypts_differently() {
        let cipher = StaticCipher::from_secret("app-secret").unwrap();
        let a = cipher.encrypt(b"same").unwrap();
        let b = cipher.encrypt(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let writer = StaticCipher::from_secret("app-secret").unwrap();
        let reader = StaticCipher::from_secret("other-secret").unwrap();
        let text = writer.encrypt(b"payload").unwrap();
        assert!(matches!(reader.decrypt(&text), Err(CipherError::Decrypt)));
    }

    #[test]
    fn test_flipped_byte_fails() {
        let cipher = StaticCipher::from_secret("app-secret").unwrap();
        let text = cipher.encrypt(b"payload").unwrap();

        let mut raw = STANDARD.decode(&text).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = STANDARD.encode(raw);

        assert!(matches!(cipher.decrypt(&tampered), Err(CipherError::Decrypt)));
    }

    #[test]
    fn test_malformed_text_fails() {
        let cipher = StaticCipher::from_secret("app-secret").unwrap();
        assert!(matches!(cipher.decrypt("not base64!"), Err(CipherError::Encoding(_))));
        assert!(matches!(cipher.decrypt("AAAA"), Err(CipherError::Truncated(3))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cipher = StaticCipher::from_secret("app-secret").unwrap();
        assert!(format!("{:?}", cipher).contains("<redacted>"));
    }
}
