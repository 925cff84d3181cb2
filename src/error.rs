//! Reveal Gallery - Error Types

use thiserror::Error;

/// Result type for gallery operations
pub type GalleryResult<T> = Result<T, GalleryError>;

/// Gallery error types
#[derive(Error, Debug)]
pub enum GalleryError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // ═══════════════════════════════════════════════════════════════
    // GALLERY ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Manifest unavailable: {0}")]
    Manifest(String),

    #[error("Name collision: '{name}' maps to positions {first} and {second}")]
    NameCollision {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("A gallery is already open")]
    GalleryAlreadyOpen,

    #[error("Gallery was closed while opening")]
    OpenSuperseded,

    // ═══════════════════════════════════════════════════════════════
    // ASSET ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("Failed to decrypt {path}: {reason}")]
    Decrypt { path: String, reason: String },

    // ═══════════════════════════════════════════════════════════════
    // PRESENT ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("{0}")]
    PresentLocked(String),

    #[error("No present for folder: {0}")]
    UnknownPresent(String),

    // ═══════════════════════════════════════════════════════════════
    // CONFIG / IO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GalleryError {
    /// Errors scoped to a single asset; the slot becomes Missing and
    /// navigation carries on.
    pub fn is_per_asset(&self) -> bool {
        matches!(self, GalleryError::Fetch { .. } | GalleryError::Decrypt { .. })
    }

    /// The gallery feature is unusable until the passphrase is re-entered.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            GalleryError::KeyDerivation(_) | GalleryError::InvalidKeyLength { .. }
        )
    }

    /// Errors that abort `open` before anything is shown.
    pub fn aborts_open(&self) -> bool {
        matches!(
            self,
            GalleryError::Manifest(_)
                | GalleryError::NameCollision { .. }
                | GalleryError::GalleryAlreadyOpen
                | GalleryError::OpenSuperseded
        )
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(e: serde_json::Error) -> Self {
        GalleryError::Serialization(e.to_string())
    }
}
