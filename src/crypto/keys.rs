//! Reveal Gallery - Key Material
//!
//! The session's decryption key and the sizes of the asset layout.

use secrecy::{ExposeSecret, Secret};

use crate::error::{GalleryError, GalleryResult};

/// Key length for AES-256 / ChaCha20
pub const KEY_LEN: usize = 32;

/// Nonce length at the head of every asset
pub const NONCE_LEN: usize = 12;

/// AEAD authentication tag length
pub const TAG_LEN: usize = 16;

/// Session decryption key.
///
/// Read-only after creation. Shared between concurrent decrypt tasks
/// behind an `Arc`; the bytes are zeroized when the last owner drops it.
pub struct DecryptionKey {
    inner: Secret<[u8; KEY_LEN]>,
}

impl DecryptionKey {
    /// Create a key from raw bytes
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            inner: Secret::new(bytes),
        }
    }

    /// Create a key from a slice, checking its length
    pub fn from_slice(bytes: &[u8]) -> GalleryResult<Self> {
        let array: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| GalleryError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self::new(array))
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Generate a random key
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

impl std::fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DecryptionKey([REDACTED])")
    }
}

/// Generate a random nonce for a sealed asset
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    use rand::RngCore;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
