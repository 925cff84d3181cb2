//! Reveal Gallery - Playlist
//!
//! Background music ordering and name lookup. Gallery triggers reach it
//! through [`AudioController::play_by_name`].

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::controller::AudioController;
use crate::error::{GalleryError, GalleryResult};
use crate::source::AssetSource;

/// Playlist settings from the card config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// JSON array of song file names
    pub songs_file: String,
    /// Folder the song files live in
    pub base_path: String,
    /// Left out of the shuffle; only reachable by name
    pub hidden: Vec<String>,
    /// Shuffled among themselves and played before the rest
    pub first: Vec<String>,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            songs_file: "Media/Audio/Music/songs.json".into(),
            base_path: "Media/Audio/Music".into(),
            hidden: vec![
                "Mele Kalikimaka.mp3".into(),
                "Mr Grinch.mp3".into(),
                "Rudolph.mp3".into(),
                "It Feels Like Christmas.mp3".into(),
                "Alvin and the Chipmunks.mp3".into(),
            ],
            first: vec!["LIGHTS ON.mp3".into(), "Snowman.mp3".into()],
        }
    }
}

/// Lookup key for a song: the name without a trailing `.mp3` (any case)
pub fn song_key(name: &str) -> &str {
    let len = name.len();
    if len >= 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".mp3") {
        &name[..len - 4]
    } else {
        name
    }
}

/// Ordered song list with a current position
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    songs: Vec<String>,
    keys: HashMap<String, usize>,
    hidden: Vec<String>,
    current: usize,
}

impl Playlist {
    /// Order `listing`: hidden songs dropped, `first` songs shuffled at the
    /// front, everything else shuffled after them.
    pub fn build<R: Rng + ?Sized>(listing: Vec<String>, config: &PlaylistConfig, rng: &mut R) -> Self {
        let hidden: Vec<String> = config.hidden.iter().map(|s| song_key(s).to_string()).collect();
        let first: Vec<&str> = config.first.iter().map(|s| song_key(s)).collect();

        let (mut lead, mut rest): (Vec<String>, Vec<String>) = listing
            .into_iter()
            .filter(|song| !hidden.iter().any(|h| h == song_key(song)))
            .partition(|song| first.contains(&song_key(song)));

        lead.shuffle(rng);
        rest.shuffle(rng);
        lead.extend(rest);

        let mut playlist = Self {
            songs: Vec::new(),
            keys: HashMap::new(),
            hidden,
            current: 0,
        };
        for song in lead {
            playlist.push(song);
        }
        playlist
    }

    /// Fetch the listing from `config.songs_file` and build with the thread
    /// rng
    pub async fn load(source: &dyn AssetSource, config: &PlaylistConfig) -> GalleryResult<Self> {
        let bytes = source.fetch(&config.songs_file).await?;
        let listing: Vec<String> = serde_json::from_slice(&bytes)
            .map_err(|e| GalleryError::Serialization(format!("{}: {}", config.songs_file, e)))?;

        let playlist = Self::build(listing, config, &mut rand::thread_rng());
        log::info!("Playlist loaded: {} songs", playlist.len());
        Ok(playlist)
    }

    pub fn songs(&self) -> &[String] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn now_playing(&self) -> Option<&str> {
        self.songs.get(self.current).map(String::as_str)
    }

    /// Advance cyclically
    pub fn next(&mut self) -> Option<&str> {
        if self.songs.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.songs.len();
        self.now_playing()
    }

    /// Make `name` current. A hidden song is appended to the playlist the
    /// first time it is asked for. Returns the song now playing, or `None`
    /// for an unknown name (nothing changes).
    pub fn play_by_name(&mut self, name: &str) -> Option<&str> {
        let key = song_key(name);

        if let Some(&idx) = self.keys.get(key) {
            self.current = idx;
            return self.now_playing();
        }

        if self.hidden.iter().any(|h| h == key) {
            self.push(format!("{}.mp3", key));
            self.current = self.songs.len() - 1;
            return self.now_playing();
        }

        log::warn!("Song \"{}\" not found", name);
        None
    }

    fn push(&mut self, song: String) {
        self.keys.insert(song_key(&song).to_string(), self.songs.len());
        self.songs.push(song);
    }
}

/// Shared playlist acting as the gallery's audio controller
#[derive(Debug, Default)]
pub struct PlaylistPlayer {
    base_path: String,
    playlist: Mutex<Playlist>,
}

impl PlaylistPlayer {
    pub fn new(playlist: Playlist, base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            playlist: Mutex::new(playlist),
        }
    }

    pub fn now_playing(&self) -> Option<String> {
        self.playlist.lock().now_playing().map(str::to_string)
    }

    pub fn next(&self) -> Option<String> {
        let song = self.playlist.lock().next().map(str::to_string);
        if let Some(song) = &song {
            log::info!("Now playing {}", self.path_of(song));
        }
        song
    }

    /// Origin path of a song file
    pub fn path_of(&self, song: &str) -> String {
        if self.base_path.is_empty() {
            song.to_string()
        } else {
            format!("{}/{}", self.base_path.trim_end_matches('/'), song)
        }
    }
}

impl AudioController for PlaylistPlayer {
    fn play_by_name(&self, name: &str) {
        let song = self.playlist.lock().play_by_name(name).map(str::to_string);
        if let Some(song) = song {
            log::info!("Now playing {}", self.path_of(&song));
        }
    }
}
