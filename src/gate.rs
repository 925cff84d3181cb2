//! Reveal Gallery - Passphrase Gate
//!
//! Checks the riddle answer against a stored SHA-256 digest before any key
//! derivation happens. A wrong answer earns the next hint.

use secrecy::SecretString;
use sha2::{Digest, Sha256};

use crate::error::{GalleryError, GalleryResult};

/// Trim and lowercase an answer the way it was hashed
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Lowercase hex SHA-256 of the answer bytes
pub fn hash_answer(answer: &str) -> String {
    hex::encode(Sha256::digest(answer.as_bytes()))
}

/// Result of submitting an answer
#[derive(Debug)]
pub enum GateOutcome {
    /// Correct; carries the normalized passphrase for key derivation
    Accepted(SecretString),
    /// Wrong; `hint` is the feedback to show for this attempt
    Rejected { attempts: u32, hint: Option<String> },
}

/// Riddle gate in front of the key derivation
#[derive(Debug, Clone)]
pub struct PassphraseGate {
    answer_hash: [u8; 32],
    hints: Vec<String>,
    wrong_attempts: u32,
}

impl PassphraseGate {
    /// Create a gate from a hex digest and the hints shown after each miss
    pub fn new(answer_hash_hex: &str, hints: Vec<String>) -> GalleryResult<Self> {
        let mut answer_hash = [0u8; 32];
        hex::decode_to_slice(answer_hash_hex.trim(), &mut answer_hash)
            .map_err(|e| GalleryError::Config(format!("answer_hash: {}", e)))?;

        Ok(Self {
            answer_hash,
            hints,
            wrong_attempts: 0,
        })
    }

    /// Number of wrong answers since the last correct one
    pub fn wrong_attempts(&self) -> u32 {
        self.wrong_attempts
    }

    /// Submit a raw answer
    pub fn submit(&mut self, raw: &str) -> GateOutcome {
        let answer = normalize_answer(raw);
        let digest: [u8; 32] = Sha256::digest(answer.as_bytes()).into();

        if digest == self.answer_hash {
            self.wrong_attempts = 0;
            return GateOutcome::Accepted(SecretString::new(answer));
        }

        self.wrong_attempts += 1;
        let hint = match self.hints.len() {
            0 => None,
            len => {
                let idx = (self.wrong_attempts as usize).min(len) - 1;
                Some(self.hints[idx].clone())
            }
        };

        GateOutcome::Rejected {
            attempts: self.wrong_attempts,
            hint,
        }
    }
}
