//! Reveal Gallery - Present Shelf
//!
//! Each present opens one gallery folder. Locked presents wait until every
//! unlocked one has been opened; once the shelf is empty it refills so the
//! presents can be opened again.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::controller::{OpenRequest, PresentationHost};
use crate::error::{GalleryError, GalleryResult};
use crate::triggers::{TriggerRule, TriggerSet};

/// Shown when a locked present is picked too early
pub const LOCKED_MESSAGE: &str = "Save your best presents for last, open the other ones first!";

/// One present on the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentSpec {
    /// Gallery folder under the encrypted media folder
    pub folder: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
    #[serde(default)]
    pub auto_advance: bool,
    #[serde(default)]
    pub eager: bool,
    #[serde(default)]
    pub wrap_around: bool,
}

impl PresentSpec {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            locked: false,
            triggers: Vec::new(),
            auto_advance: false,
            eager: false,
            wrap_around: false,
        }
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Gallery open parameters for this present
    pub fn open_request(&self) -> OpenRequest {
        OpenRequest::new(self.folder.clone())
            .with_triggers(TriggerSet::new(self.triggers.clone()))
            .auto_advance(self.auto_advance)
            .eager(self.eager)
            .wrap_around(self.wrap_around)
    }
}

/// The card's stock presents
pub fn default_presents() -> Vec<PresentSpec> {
    let song = |song: &str| TriggerRule::SongOnly { song: song.into() };
    let photo_song = |photo: &str, song: &str| TriggerRule::PhotoAndSong {
        photo: photo.into(),
        song: song.into(),
    };
    let auto = |folder: &str, triggers: Vec<TriggerRule>| PresentSpec {
        auto_advance: true,
        triggers,
        ..PresentSpec::new(folder)
    };

    vec![
        auto("Bass", vec![song("Rudolph.mp3")]),
        auto("Charlie", Vec::new()),
        PresentSpec {
            triggers: vec![
                photo_song("978E893A-17DE-40CB-8424-BEDDAC97DA70", "Mele Kalikimaka.mp3"),
                photo_song("1C24FE35-F070-4D32-BE9B-A2D250ABFDB7", "Alvin and the Chipmunks.mp3"),
            ],
            ..PresentSpec::new("Movies").locked()
        },
        PresentSpec::new("TV").locked(),
        PresentSpec::new("Games").locked(),
        auto("Gremlin", Vec::new()),
        auto("Grinch", vec![song("Mr Grinch")]),
        auto("Muppets", vec![song("It Feels Like Christmas.mp3")]),
    ]
}

/// Unopened presents
#[derive(Debug, Clone)]
pub struct GiftShelf {
    specs: Vec<PresentSpec>,
    remaining: Vec<PresentSpec>,
}

impl GiftShelf {
    pub fn new(specs: Vec<PresentSpec>) -> Self {
        Self {
            remaining: specs.clone(),
            specs,
        }
    }

    /// Presents still on the shelf
    pub fn remaining(&self) -> &[PresentSpec] {
        &self.remaining
    }

    /// Pick a present. A locked one stays locked while any unlocked present
    /// remains; otherwise it unlocks and its gallery request is returned.
    pub fn request_open(&mut self, folder: &str) -> GalleryResult<OpenRequest> {
        let unlocked_left = self.remaining.iter().any(|p| !p.locked);
        let present = self
            .remaining
            .iter_mut()
            .find(|p| p.folder == folder)
            .ok_or_else(|| GalleryError::UnknownPresent(folder.to_string()))?;

        if present.locked {
            if unlocked_left {
                return Err(GalleryError::PresentLocked(LOCKED_MESSAGE.into()));
            }
            log::info!("Present {} unlocked", folder);
            present.locked = false;
        }

        Ok(present.open_request())
    }

    /// The present's opening animation is done; take it off the shelf
    pub fn finish_opening(&mut self, folder: &str) {
        self.remaining.retain(|p| p.folder != folder);
    }

    /// When every present is opened, refill the shelf and report `true`
    pub fn check_all_opened(&mut self) -> bool {
        if !self.remaining.is_empty() {
            return false;
        }
        log::info!("All presents opened");
        self.remaining = self.specs.clone();
        true
    }
}

/// Card-level presentation host: the main card view plus the shelf
#[derive(Debug)]
pub struct CardHost {
    shelf: Mutex<GiftShelf>,
    main_view_visible: AtomicBool,
}

impl CardHost {
    pub fn new(shelf: GiftShelf) -> Self {
        Self {
            shelf: Mutex::new(shelf),
            main_view_visible: AtomicBool::new(true),
        }
    }

    pub fn main_view_visible(&self) -> bool {
        self.main_view_visible.load(Ordering::SeqCst)
    }

    pub fn request_open(&self, folder: &str) -> GalleryResult<OpenRequest> {
        self.shelf.lock().request_open(folder)
    }

    pub fn finish_opening(&self, folder: &str) {
        self.shelf.lock().finish_opening(folder);
    }

    pub fn remaining(&self) -> Vec<String> {
        self.shelf
            .lock()
            .remaining()
            .iter()
            .map(|p| p.folder.clone())
            .collect()
    }
}

impl PresentationHost for CardHost {
    fn suppress_main_view(&self) {
        self.main_view_visible.store(false, Ordering::SeqCst);
    }

    fn restore_main_view(&self) {
        self.main_view_visible.store(true, Ordering::SeqCst);
    }

    fn all_groups_exhausted(&self) -> bool {
        self.shelf.lock().check_all_opened()
    }
}
