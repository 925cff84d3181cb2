//! Reveal Gallery - AEAD Asset Sealing
//!
//! Asset layout on the origin:
//! ```text
//! [NONCE 12B][CIPHERTEXT variable][TAG 16B]
//! ```
//! No associated data. AES-256-GCM by default, ChaCha20-Poly1305 optional;
//! both share the same nonce and tag sizes.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::keys::{generate_nonce, DecryptionKey, NONCE_LEN, TAG_LEN};
use crate::error::{GalleryError, GalleryResult};

/// AEAD cipher the assets were sealed with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCipher {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// Encrypted asset split into nonce and sealed body
pub struct EncryptedAsset<'a> {
    /// 12-byte nonce
    pub nonce: &'a [u8],
    /// Ciphertext with authentication tag
    pub ciphertext: &'a [u8],
}

impl<'a> EncryptedAsset<'a> {
    /// Split raw asset bytes; anything shorter than nonce + tag is truncated
    pub fn from_bytes(data: &'a [u8]) -> Option<Self> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return None;
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        Some(Self { nonce, ciphertext })
    }
}

/// Decrypt asset bytes. `path` only labels the error.
pub fn open_asset(
    key: &DecryptionKey,
    cipher: AssetCipher,
    path: &str,
    data: &[u8],
) -> GalleryResult<Zeroizing<Vec<u8>>> {
    let fail = |reason: &str| GalleryError::Decrypt {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let asset = EncryptedAsset::from_bytes(data).ok_or_else(|| fail("Data too short"))?;
    let nonce = Nonce::from_slice(asset.nonce);

    let plaintext = match cipher {
        AssetCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key.expose())
            .map_err(|e| fail(&e.to_string()))?
            .decrypt(nonce, asset.ciphertext),
        AssetCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key.expose())
            .map_err(|e| fail(&e.to_string()))?
            .decrypt(nonce, asset.ciphertext),
    }
    .map_err(|_| fail("Authentication failed"))?;

    Ok(Zeroizing::new(plaintext))
}

/// Seal plaintext into the asset layout with a fresh random nonce
pub fn seal_asset(
    key: &DecryptionKey,
    cipher: AssetCipher,
    plaintext: &[u8],
) -> GalleryResult<Vec<u8>> {
    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = match cipher {
        AssetCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key.expose())
            .map_err(|e| GalleryError::Encryption(e.to_string()))?
            .encrypt(nonce, plaintext),
        AssetCipher::ChaCha20Poly1305 => ChaCha20Poly1305::new_from_slice(key.expose())
            .map_err(|e| GalleryError::Encryption(e.to_string()))?
            .encrypt(nonce, plaintext),
    }
    .map_err(|e| GalleryError::Encryption(e.to_string()))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}
