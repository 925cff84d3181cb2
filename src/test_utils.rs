//! Shared fixtures for unit tests: sealed in-memory galleries, a fetch
//! counting source and recording collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::cache::Slot;
use crate::controller::{AudioController, GalleryView, PresentationHost};
use crate::crypto::{seal_asset, AssetCipher, DecryptionKey};
use crate::error::GalleryResult;
use crate::session::SessionContext;
use crate::source::{AssetSource, MemorySource};

/// Memory source that counts fetches per path
#[derive(Default)]
pub struct CountingSource {
    inner: MemorySource,
    counts: Mutex<HashMap<String, usize>>,
}

impl CountingSource {
    pub fn insert(&self, path: &str, data: Vec<u8>) {
        self.inner.insert(path, data);
    }

    pub fn fetches(&self, path: &str) -> usize {
        self.counts.lock().get(path).copied().unwrap_or(0)
    }

    /// Flip the last byte of a sealed asset so its tag no longer verifies
    pub fn corrupt(&self, path: &str) {
        if let Some(mut data) = self.inner.remove(path) {
            if let Some(last) = data.last_mut() {
                *last ^= 0xff;
            }
            self.inner.insert(path, data);
        }
    }
}

#[async_trait]
impl AssetSource for CountingSource {
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>> {
        *self.counts.lock().entry(path.to_string()).or_insert(0) += 1;
        self.inner.fetch(path).await
    }
}

/// Source whose fetches of held paths park until released
pub struct GatedSource {
    inner: Arc<CountingSource>,
    held: Mutex<HashSet<String>>,
    released: Notify,
}

impl GatedSource {
    pub fn new(inner: Arc<CountingSource>) -> Self {
        Self {
            inner,
            held: Mutex::new(HashSet::new()),
            released: Notify::new(),
        }
    }

    pub fn hold(&self, path: &str) {
        self.held.lock().insert(path.to_string());
    }

    pub fn release(&self, path: &str) {
        self.held.lock().remove(path);
        self.released.notify_waiters();
    }
}

#[async_trait]
impl AssetSource for GatedSource {
    async fn fetch(&self, path: &str) -> GalleryResult<Vec<u8>> {
        loop {
            // registered before the check so a release in between is not lost
            let released = self.released.notified();
            let held = self.held.lock().contains(path);
            if !held {
                break;
            }
            released.await;
        }
        self.inner.fetch(path).await
    }
}

/// Seal `names` into `folder/` (plaintext `photo:<name>`) with a fresh key
/// and write `folder/index.json`.
pub fn sealed_gallery(folder: &str, names: &[&str]) -> (Arc<CountingSource>, SessionContext) {
    let source = Arc::new(CountingSource::default());
    let key = Arc::new(DecryptionKey::generate());
    add_folder(&source, &key, folder, names);

    let session = SessionContext::new(key, source.clone(), AssetCipher::Aes256Gcm);
    (source, session)
}

/// Add another sealed folder to an existing fixture source
pub fn add_folder(source: &CountingSource, key: &DecryptionKey, folder: &str, names: &[&str]) {
    for name in names {
        let plaintext = format!("photo:{}", name);
        let sealed = seal_asset(key, AssetCipher::Aes256Gcm, plaintext.as_bytes()).unwrap();
        source.insert(&format!("{}/{}", folder, name), sealed);
    }
    let manifest = serde_json::to_vec(names).unwrap();
    source.insert(&format!("{}/index.json", folder), manifest);
}

/// Give spawned tasks on the current-thread runtime a chance to run
pub async fn yield_many() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RECORDING COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    ShowGallery,
    HideGallery,
    Controls(bool),
    Show(usize, String),
    ShowMissing(usize),
    BeginCrossfade { from: usize, to: usize },
    FinishCrossfade(usize),
    AbortCrossfade(usize),
    Clear,
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn controls_visible(&self) -> Option<bool> {
        self.events.lock().iter().rev().find_map(|e| match e {
            ViewEvent::Controls(v) => Some(*v),
            _ => None,
        })
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().push(event);
    }
}

fn label(slot: &Slot) -> String {
    slot.resource()
        .map(|r| String::from_utf8_lossy(r.bytes()).into_owned())
        .unwrap_or_default()
}

impl GalleryView for RecordingView {
    fn show_gallery(&self) {
        self.push(ViewEvent::ShowGallery);
    }

    fn hide_gallery(&self) {
        self.push(ViewEvent::HideGallery);
    }

    fn set_controls_visible(&self, visible: bool) {
        self.push(ViewEvent::Controls(visible));
    }

    fn show(&self, position: usize, slot: &Slot) {
        match slot {
            Slot::Resolved(_) => self.push(ViewEvent::Show(position, label(slot))),
            Slot::Missing => self.push(ViewEvent::ShowMissing(position)),
        }
    }

    fn begin_crossfade(&self, from: usize, to: usize, _slot: &Slot, _duration: std::time::Duration) {
        self.push(ViewEvent::BeginCrossfade { from, to });
    }

    fn finish_crossfade(&self, to: usize) {
        self.push(ViewEvent::FinishCrossfade(to));
    }

    fn abort_crossfade(&self, to: usize) {
        self.push(ViewEvent::AbortCrossfade(to));
    }

    fn clear(&self) {
        self.push(ViewEvent::Clear);
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    played: Mutex<Vec<String>>,
}

impl RecordingAudio {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().clone()
    }
}

impl AudioController for RecordingAudio {
    fn play_by_name(&self, name: &str) {
        self.played.lock().push(name.to_string());
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub suppressed: Mutex<u32>,
    pub restored: Mutex<u32>,
    pub exhausted_answers: Mutex<Vec<bool>>,
    pub exhausted: Mutex<bool>,
}

impl RecordingHost {
    pub fn set_exhausted(&self, value: bool) {
        *self.exhausted.lock() = value;
    }

    pub fn queries(&self) -> usize {
        self.exhausted_answers.lock().len()
    }
}

impl PresentationHost for RecordingHost {
    fn suppress_main_view(&self) {
        *self.suppressed.lock() += 1;
    }

    fn restore_main_view(&self) {
        *self.restored.lock() += 1;
    }

    fn all_groups_exhausted(&self) -> bool {
        let answer = *self.exhausted.lock();
        self.exhausted_answers.lock().push(answer);
        answer
    }
}
