//! Reveal Gallery - Passphrase Key Derivation
//!
//! PBKDF2-HMAC-SHA256 (the format the existing assets were sealed with)
//! or Argon2id, both yielding a 256-bit AEAD key.

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::Hmac;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::keys::{DecryptionKey, KEY_LEN};
use crate::error::{GalleryError, GalleryResult};

/// Lowest accepted PBKDF2 iteration count
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Application-wide salt used by the card
pub const DEFAULT_SALT: &str = "static-salt-or-something-obscure";

/// KDF selection and parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "lowercase")]
pub enum KdfConfig {
    /// PBKDF2 with HMAC-SHA256
    Pbkdf2 { iterations: u32 },
    /// Argon2id
    Argon2id {
        /// Memory in KiB
        memory_kib: u32,
        /// Iterations (time cost)
        time_cost: u32,
        parallelism: u32,
    },
}

impl Default for KdfConfig {
    fn default() -> Self {
        KdfConfig::Pbkdf2 {
            iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

impl KdfConfig {
    /// Argon2id tuned for phones
    pub fn argon2id_low_memory() -> Self {
        KdfConfig::Argon2id {
            memory_kib: 16 * 1024,
            time_cost: 4,
            parallelism: 1,
        }
    }

    /// Reject parameter sets weaker than the card allows
    pub fn validate(&self) -> GalleryResult<()> {
        match self {
            KdfConfig::Pbkdf2 { iterations } if *iterations < MIN_PBKDF2_ITERATIONS => {
                Err(GalleryError::Config(format!(
                    "PBKDF2 needs at least {} iterations, got {}",
                    MIN_PBKDF2_ITERATIONS, iterations
                )))
            }
            KdfConfig::Argon2id { parallelism: 0, .. } => {
                Err(GalleryError::Config("Argon2id parallelism must be > 0".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Derive the session key from a passphrase.
///
/// Deterministic for a given passphrase, salt and config. The passphrase is
/// assumed to have been validated already; this only fails when the
/// underlying primitive rejects its parameters.
pub fn derive_key(
    passphrase: &SecretString,
    salt: &[u8],
    config: &KdfConfig,
) -> GalleryResult<DecryptionKey> {
    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    let password = passphrase.expose_secret().as_bytes();

    match config {
        KdfConfig::Pbkdf2 { iterations } => {
            pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, *iterations, &mut output[..])
                .map_err(|e| GalleryError::KeyDerivation(format!("PBKDF2 failed: {}", e)))?;
        }
        KdfConfig::Argon2id {
            memory_kib,
            time_cost,
            parallelism,
        } => {
            let params = Params::new(*memory_kib, *time_cost, *parallelism, Some(KEY_LEN))
                .map_err(|e| {
                    GalleryError::KeyDerivation(format!("Invalid Argon2 params: {}", e))
                })?;

            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(password, salt, &mut output[..])
                .map_err(|e| GalleryError::KeyDerivation(format!("Hashing failed: {}", e)))?;
        }
    }

    Ok(DecryptionKey::new(*output))
}

/// Run [`derive_key`] on the blocking pool so the caller's task keeps
/// yielding while the KDF grinds.
pub async fn derive_key_blocking(
    passphrase: SecretString,
    salt: Vec<u8>,
    config: KdfConfig,
) -> GalleryResult<DecryptionKey> {
    tokio::task::spawn_blocking(move || derive_key(&passphrase, &salt, &config))
        .await
        .map_err(|e| GalleryError::KeyDerivation(format!("KDF task failed: {}", e)))?
}
