//! Reveal Gallery - Card Configuration
//!
//! One JSON file describes a card: where the sealed media lives, how the
//! key is derived, the riddle, the presents and the playlist.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{AssetCipher, KdfConfig, DEFAULT_SALT};
use crate::error::{GalleryError, GalleryResult};
use crate::gate::PassphraseGate;
use crate::gesture::{SwipePolicy, DEFAULT_SWIPE_MIN_PX};
use crate::playlist::PlaylistConfig;
use crate::presents::{default_presents, PresentSpec};

/// Salts shorter than this are rejected
pub const MIN_SALT_LEN: usize = 8;

/// Slideshow timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Cross-fade duration
    pub fade_ms: u64,
    /// Delay before the automatic fade from the first asset to the second
    pub auto_advance_ms: u64,
    /// Minimum horizontal swipe travel
    pub swipe_min_px: f32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fade_ms: 3000,
            auto_advance_ms: 3000,
            swipe_min_px: DEFAULT_SWIPE_MIN_PX,
        }
    }
}

impl Timing {
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    pub fn auto_advance(&self) -> Duration {
        Duration::from_millis(self.auto_advance_ms)
    }

    pub fn swipe_policy(&self) -> SwipePolicy {
        SwipePolicy::new(self.swipe_min_px)
    }
}

/// Card configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Filesystem root or base URL of the media origin
    pub media_root: String,
    /// Folder holding one sub-folder per gallery
    pub encrypted_folder: String,
    /// Manifest file name inside each gallery folder
    pub index_file: String,
    /// Application-wide KDF salt
    pub salt: String,
    pub kdf: KdfConfig,
    pub cipher: AssetCipher,
    /// Hex SHA-256 of the normalized riddle answer
    pub answer_hash: String,
    /// Feedback after each wrong answer; the last one repeats
    pub hints: Vec<String>,
    pub timing: Timing,
    pub presents: Vec<PresentSpec>,
    pub playlist: PlaylistConfig,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            media_root: ".".into(),
            encrypted_folder: "Media/EncryptedPhotos".into(),
            index_file: "index.json".into(),
            salt: DEFAULT_SALT.into(),
            kdf: KdfConfig::default(),
            cipher: AssetCipher::default(),
            answer_hash: "10f3525281a9d1d581d7a8de31af7f64938691f1f50790aeb5de064f02dbfbb8".into(),
            hints: vec![
                "You can do better than that. Try again for a hint.".into(),
                "Hint: Her aroma is always in the air!".into(),
                "Hint: Her smell in the morning.".into(),
            ],
            timing: Timing::default(),
            presents: default_presents(),
            playlist: PlaylistConfig::default(),
        }
    }
}

impl CardConfig {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> GalleryResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| GalleryError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GalleryResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> GalleryResult<()> {
        self.kdf.validate()?;

        if self.salt.len() < MIN_SALT_LEN {
            return Err(GalleryError::Config(format!(
                "salt must be at least {} bytes",
                MIN_SALT_LEN
            )));
        }

        self.gate()?;

        let mut seen = HashSet::new();
        for present in &self.presents {
            if !seen.insert(present.folder.as_str()) {
                return Err(GalleryError::Config(format!(
                    "duplicate present folder: {}",
                    present.folder
                )));
            }
        }

        Ok(())
    }

    /// Passphrase gate for this card's riddle
    pub fn gate(&self) -> GalleryResult<PassphraseGate> {
        PassphraseGate::new(&self.answer_hash, self.hints.clone())
    }

    /// Origin path of a gallery folder
    pub fn folder_path(&self, folder: &str) -> String {
        join_path(&self.encrypted_folder, folder)
    }

    /// Origin path of a gallery folder's manifest
    pub fn index_path(&self, folder: &str) -> String {
        join_path(&self.folder_path(folder), &self.index_file)
    }
}

/// Join origin path segments with `/`, skipping an empty prefix
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
