//! Reveal Gallery - Decryption Pipeline
//!
//! Fetches folder manifests and sealed assets from the session's source and
//! opens them with the session key.

use std::sync::Arc;

use image::ImageFormat;
use zeroize::Zeroizing;

use crate::crypto::{open_asset, AssetCipher, DecryptionKey};
use crate::error::{GalleryError, GalleryResult};
use crate::session::SessionContext;
use crate::source::AssetSource;

/// A decrypted, displayable asset
pub struct Resource {
    path: String,
    bytes: Zeroizing<Vec<u8>>,
    format: Option<ImageFormat>,
}

/// Shared handle to a resolved resource. Two handles to the same
/// resolution compare equal under `Arc::ptr_eq`.
pub type ResourceHandle = Arc<Resource>;

impl Resource {
    pub fn new(path: impl Into<String>, bytes: Zeroizing<Vec<u8>>) -> Self {
        let format = image::guess_format(&bytes).ok();
        Self {
            path: path.into(),
            bytes,
            format,
        }
    }

    /// Asset path the resource was decrypted from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decrypted bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Image format sniffed from the magic bytes, if recognised
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .finish()
    }
}

/// Manifest and asset decryption for one session
#[derive(Clone)]
pub struct DecryptionPipeline {
    source: Arc<dyn AssetSource>,
    key: Arc<DecryptionKey>,
    cipher: AssetCipher,
}

impl DecryptionPipeline {
    pub fn new(session: &SessionContext) -> Self {
        Self {
            source: session.source(),
            key: session.key(),
            cipher: session.cipher(),
        }
    }

    /// Fetch a folder manifest and prefix each entry with `folder`.
    ///
    /// Any fetch or parse failure is a `Manifest` error; an empty manifest
    /// is one too, since there is nothing to show.
    pub async fn fetch_manifest(&self, index_path: &str, folder: &str) -> GalleryResult<Vec<String>> {
        let bytes = self
            .source
            .fetch(index_path)
            .await
            .map_err(|e| GalleryError::Manifest(e.to_string()))?;

        let names: Vec<String> = serde_json::from_slice(&bytes)
            .map_err(|e| GalleryError::Manifest(format!("{}: {}", index_path, e)))?;

        if names.is_empty() {
            return Err(GalleryError::Manifest(format!("{}: no entries", index_path)));
        }

        let folder = folder.trim_end_matches('/');
        Ok(names
            .into_iter()
            .map(|name| format!("{}/{}", folder, name))
            .collect())
    }

    /// Fetch and decrypt one asset
    pub async fn decrypt_asset(&self, path: &str) -> GalleryResult<Resource> {
        let sealed = self.source.fetch(path).await?;
        let plaintext = open_asset(&self.key, self.cipher, path, &sealed)?;
        Ok(Resource::new(path, plaintext))
    }
}
