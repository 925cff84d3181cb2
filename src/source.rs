//! Reveal Gallery - Asset Sources
//!
//! Read-only access to the static origin the sealed assets and manifests
//! live on: a directory, an in-memory map, or an HTTP base URL.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{GalleryError, GalleryResult};

/// Read-only byte source addressed by `/`-separated relative paths
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the bytes stored at `path`
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>>;
}

fn fetch_error(path: &str, reason: impl ToString) -> GalleryError {
    GalleryError::Fetch {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FILESYSTEM
// ═══════════════════════════════════════════════════════════════════════════

/// Directory-backed source
#[derive(Debug, Clone)]
pub struct FsSource {
    /// Root directory
    root: PathBuf,
}

impl FsSource {
    /// Create new FsSource with root directory
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get full path for a relative file; refuses to leave the root
    fn full_path(&self, relative: &str) -> Option<PathBuf> {
        let relative = Path::new(relative.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            None
        } else {
            Some(self.root.join(relative))
        }
    }
}

#[async_trait]
impl AssetSource for FsSource {
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>> {
        let full = self
            .full_path(path)
            .ok_or_else(|| fetch_error(path, "path escapes the media root"))?;

        tokio::fs::read(&full).await.map_err(|e| fetch_error(path, e))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MEMORY
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory source
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the bytes at `path`
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    /// Drop the file at `path`
    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.write().remove(path)
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| fetch_error(path, "not found"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP
// ═══════════════════════════════════════════════════════════════════════════

/// Static HTTP origin
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpSource {
    pub fn new(base_url: &str) -> GalleryResult<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("reveal-gallery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GalleryError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| fetch_error(path, e))?;

        if !response.status().is_success() {
            return Err(fetch_error(path, format!("HTTP status: {}", response.status())));
        }

        let body = response.bytes().await.map_err(|e| fetch_error(path, e))?;
        Ok(body.to_vec())
    }
}
