//! # Reveal Gallery
//!
//! Encrypted photo galleries behind a riddle, for a gift-reveal card.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      REVEAL GALLERY                      │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────┐   │
//! │  │  RIDDLE     │  │  SESSION    │  │  ASSET SOURCE   │   │
//! │  │  GATE       │─▶│  PBKDF2 key │  │  fs / mem / http│   │
//! │  └─────────────┘  └──────┬──────┘  └────────┬────────┘   │
//! │                          │                  │            │
//! │  ┌───────────────────────┴──────────────────┴─────────┐  │
//! │  │        DECRYPTION PIPELINE  (AES-256-GCM)          │  │
//! │  │     manifest fetch  →  [nonce][ciphertext‖tag]     │  │
//! │  └─────────────────────────┬──────────────────────────┘  │
//! │                            │                             │
//! │  ┌─────────────┐  ┌────────┴────────┐  ┌──────────────┐  │
//! │  │ ASSET INDEX │  │ LAZY IMAGE CACHE│  │  TRIGGERS    │  │
//! │  │ name → pos  │  │ single-flight   │  │  song cues   │  │
//! │  └──────┬──────┘  └────────┬────────┘  └──────┬───────┘  │
//! │         └─────────┬────────┴──────────────────┘          │
//! │            ┌──────┴──────────────┐                       │
//! │            │ SLIDESHOW CONTROLLER│── view / audio / host │
//! │            └─────────────────────┘                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Passphrase checked against a SHA-256 digest before any derivation
//! - One PBKDF2-HMAC-SHA256 key per session, shared read-only
//! - Every asset authenticated (AES-256-GCM or ChaCha20-Poly1305)
//! - Decrypted bytes and key material zeroized on drop

pub mod cache;
pub mod config;
pub mod controller;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod gesture;
pub mod index;
pub mod pipeline;
pub mod playlist;
pub mod presents;
pub mod schedule;
pub mod session;
pub mod source;
pub mod triggers;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cache::{LazyImageCache, LoadPolicy, Slot};
pub use config::CardConfig;
pub use controller::{
    AudioController, GalleryState, GalleryView, NavOutcome, OpenRequest, PresentationHost,
    SlideshowController,
};
pub use error::{GalleryError, GalleryResult};
pub use gate::{GateOutcome, PassphraseGate};
pub use index::AssetIndex;
pub use pipeline::{DecryptionPipeline, Resource};
pub use session::SessionContext;
pub use triggers::{TriggerRule, TriggerSet};

/// Reveal Gallery version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
