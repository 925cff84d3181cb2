//! Reveal Gallery - Cryptographic Core
//!
//! Passphrase key derivation and AEAD asset sealing. The primitives come
//! from RustCrypto; nothing here implements a cipher.

pub mod keys;
pub mod aead;
pub mod kdf;

pub use keys::*;
pub use aead::*;
pub use kdf::*;
