//! Reveal Gallery - Session Context
//!
//! Everything that lives for one unlocked session: the derived key, the
//! origin the assets are read from and the cipher they were sealed with.
//! Built once after the passphrase is accepted and handed to the pipeline
//! and controller constructors.

use std::sync::Arc;

use crate::config::CardConfig;
use crate::crypto::{derive_key_blocking, AssetCipher, DecryptionKey};
use crate::error::GalleryResult;
use crate::gate::{GateOutcome, PassphraseGate};
use crate::source::AssetSource;

/// Session-scoped key and origin
#[derive(Clone)]
pub struct SessionContext {
    key: Arc<DecryptionKey>,
    source: Arc<dyn AssetSource>,
    cipher: AssetCipher,
}

impl SessionContext {
    pub fn new(key: Arc<DecryptionKey>, source: Arc<dyn AssetSource>, cipher: AssetCipher) -> Self {
        Self { key, source, cipher }
    }

    /// Validate `raw` at the gate, then derive the session key.
    ///
    /// Returns `Ok(None)` for a wrong answer (the gate has the hint).
    /// A KDF failure is session-fatal and comes back as `Err`.
    pub async fn unlock(
        gate: &mut PassphraseGate,
        raw: &str,
        config: &CardConfig,
        source: Arc<dyn AssetSource>,
    ) -> GalleryResult<Option<Self>> {
        let passphrase = match gate.submit(raw) {
            GateOutcome::Accepted(passphrase) => passphrase,
            GateOutcome::Rejected { attempts, .. } => {
                log::info!("Passphrase rejected (attempt {})", attempts);
                return Ok(None);
            }
        };

        let key = derive_key_blocking(
            passphrase,
            config.salt.as_bytes().to_vec(),
            config.kdf.clone(),
        )
        .await?;

        log::info!("Session key derived");
        Ok(Some(Self::new(Arc::new(key), source, config.cipher)))
    }

    pub fn key(&self) -> Arc<DecryptionKey> {
        Arc::clone(&self.key)
    }

    pub fn source(&self) -> Arc<dyn AssetSource> {
        Arc::clone(&self.source)
    }

    pub fn cipher(&self) -> AssetCipher {
        self.cipher
    }
}
