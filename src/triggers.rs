//! Reveal Gallery - Trigger Rules
//!
//! Song cues attached to a gallery. Rules are order-significant: the first
//! rule that matches wins and the rest are ignored.

use serde::{Deserialize, Serialize};

use crate::index::AssetIndex;

/// A cue attached to a photo, a song, or both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTrigger", into = "RawTrigger")]
pub enum TriggerRule {
    /// Marks a photo; plays nothing
    PhotoOnly { photo: String },
    /// Plays when the gallery opens
    SongOnly { song: String },
    /// Plays when the photo is entered
    PhotoAndSong { photo: String, song: String },
}

/// Card JSON shape: `{ "photo"?: ..., "song"?: ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    song: Option<String>,
}

impl TryFrom<RawTrigger> for TriggerRule {
    type Error = String;

    fn try_from(raw: RawTrigger) -> Result<Self, Self::Error> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        match (non_empty(raw.photo), non_empty(raw.song)) {
            (Some(photo), Some(song)) => Ok(TriggerRule::PhotoAndSong { photo, song }),
            (Some(photo), None) => Ok(TriggerRule::PhotoOnly { photo }),
            (None, Some(song)) => Ok(TriggerRule::SongOnly { song }),
            (None, None) => Err("trigger needs a photo or a song".into()),
        }
    }
}

impl From<TriggerRule> for RawTrigger {
    fn from(rule: TriggerRule) -> Self {
        match rule {
            TriggerRule::PhotoOnly { photo } => RawTrigger {
                photo: Some(photo),
                song: None,
            },
            TriggerRule::SongOnly { song } => RawTrigger {
                photo: None,
                song: Some(song),
            },
            TriggerRule::PhotoAndSong { photo, song } => RawTrigger {
                photo: Some(photo),
                song: Some(song),
            },
        }
    }
}

/// Ordered trigger rules of one gallery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    rules: Vec<TriggerRule>,
}

impl TriggerSet {
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Song to play as the gallery opens: the first `SongOnly` rule
    pub fn opening_cue(&self) -> Option<&str> {
        self.rules.iter().find_map(|rule| match rule {
            TriggerRule::SongOnly { song } => Some(song.as_str()),
            _ => None,
        })
    }

    /// Song to play on entering `position`: the first `PhotoAndSong` rule
    /// whose photo resolves to that position
    pub fn cue_for(&self, position: usize, index: &AssetIndex) -> Option<&str> {
        self.rules.iter().find_map(|rule| match rule {
            TriggerRule::PhotoAndSong { photo, song }
                if index.position_of(photo) == Some(position) =>
            {
                Some(song.as_str())
            }
            _ => None,
        })
    }
}

impl From<Vec<TriggerRule>> for TriggerSet {
    fn from(rules: Vec<TriggerRule>) -> Self {
        Self::new(rules)
    }
}
