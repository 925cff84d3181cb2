//! Reveal Gallery - Lazy Image Cache
//!
//! Per-gallery slot table. Each manifest position is decrypted at most once
//! per outcome: concurrent requests for the same position share one
//! in-flight task, and the result (resource or Missing) is memoized until
//! the gallery closes. A Missing slot is retried only after the user has
//! left it and navigates back.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::pipeline::{DecryptionPipeline, ResourceHandle};

/// Outcome of resolving a position
#[derive(Debug, Clone)]
pub enum Slot {
    Resolved(ResourceHandle),
    /// Fetch or decrypt failed; the view shows the unavailable affordance
    Missing,
}

impl Slot {
    pub fn is_missing(&self) -> bool {
        matches!(self, Slot::Missing)
    }

    pub fn resource(&self) -> Option<&ResourceHandle> {
        match self {
            Slot::Resolved(handle) => Some(handle),
            Slot::Missing => None,
        }
    }
}

/// When slots get decrypted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Everything, sequentially, before the gallery becomes interactive
    Eager,
    /// On first access
    #[default]
    Lazy,
}

/// Slot counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub len: usize,
    pub resolved: usize,
    pub missing: usize,
    pub in_flight: usize,
}

enum SlotState {
    Absent,
    InFlight(watch::Receiver<Option<Slot>>),
    Ready(Slot),
    /// Missing, and the user has since navigated away: the next entry
    /// retries it
    Stale,
}

struct CacheState {
    /// Bumped on every open and close; in-flight work carries the value it
    /// started under and is discarded when it no longer matches.
    generation: u64,
    paths: Vec<String>,
    slots: Vec<SlotState>,
}

enum Claim {
    Ready(Slot),
    Waiting(watch::Receiver<Option<Slot>>),
    /// Already resolved or in flight; only returned to preload
    Busy,
    OutOfRange,
}

/// Memoizing resource cache for the open gallery
#[derive(Clone)]
pub struct LazyImageCache {
    pipeline: DecryptionPipeline,
    state: Arc<Mutex<CacheState>>,
}

impl LazyImageCache {
    pub fn new(pipeline: DecryptionPipeline) -> Self {
        Self {
            pipeline,
            state: Arc::new(Mutex::new(CacheState {
                generation: 0,
                paths: Vec::new(),
                slots: Vec::new(),
            })),
        }
    }

    /// Reset the cache for a new manifest. All slots start absent.
    /// Returns the generation tagging work for this manifest.
    pub fn open(&self, paths: Vec<String>) -> u64 {
        let mut state = self.state.lock();
        state.generation += 1;
        state.slots = paths.iter().map(|_| SlotState::Absent).collect();
        state.paths = paths;
        state.generation
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eager policy: resolve every slot in manifest order. Failed entries
    /// become Missing and loading continues. Stops early if the cache is
    /// closed underneath it.
    pub async fn load_all(&self) -> CacheStats {
        let (generation, len) = {
            let state = self.state.lock();
            (state.generation, state.slots.len())
        };

        for position in 0..len {
            if self.generation() != generation {
                log::debug!("Eager load abandoned at position {}", position);
                break;
            }
            self.resolve(position).await;
        }

        self.stats()
    }

    /// Resolve a position, decrypting on first access. Repeated calls return
    /// the memoized outcome, Missing included.
    pub async fn resolve(&self, position: usize) -> Slot {
        match self.claim(position, false) {
            Claim::Ready(slot) => slot,
            Claim::Waiting(rx) => Self::wait(rx).await,
            Claim::Busy | Claim::OutOfRange => Slot::Missing,
        }
    }

    /// Resolve a position the user is navigating onto. A Missing slot the
    /// user has left since it failed gets one fresh attempt; any other
    /// outcome is returned as memoized.
    pub async fn reattempt(&self, position: usize) -> Slot {
        {
            let mut state = self.state.lock();
            if let Some(slot) = state.slots.get_mut(position) {
                if matches!(slot, SlotState::Stale) {
                    *slot = SlotState::Absent;
                }
            }
        }
        self.resolve(position).await
    }

    /// The user navigated away from `position`. A Missing outcome there
    /// becomes eligible for one retry on the next [`reattempt`].
    ///
    /// [`reattempt`]: LazyImageCache::reattempt
    pub fn leave(&self, position: usize) {
        let mut state = self.state.lock();
        if let Some(slot) = state.slots.get_mut(position) {
            if matches!(slot, SlotState::Ready(Slot::Missing)) {
                *slot = SlotState::Stale;
            }
        }
    }

    /// Start resolving the slot after `position` (cyclically) without
    /// waiting for it. No-op when that slot is resolved, Missing or already
    /// in flight.
    pub fn preload(&self, position: usize) {
        let len = self.len();
        if len == 0 {
            return;
        }

        let next = (position + 1) % len;
        if let Claim::Waiting(_) = self.claim(next, true) {
            log::debug!("Preloading position {}", next);
        }
    }

    /// Current slot outcome without triggering work
    pub fn peek(&self, position: usize) -> Option<Slot> {
        match self.state.lock().slots.get(position) {
            Some(SlotState::Ready(slot)) => Some(slot.clone()),
            Some(SlotState::Stale) => Some(Slot::Missing),
            _ => None,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = CacheStats {
            len: state.slots.len(),
            ..CacheStats::default()
        };

        for slot in &state.slots {
            match slot {
                SlotState::Absent => {}
                SlotState::InFlight(_) => stats.in_flight += 1,
                SlotState::Ready(Slot::Resolved(_)) => stats.resolved += 1,
                SlotState::Ready(Slot::Missing) | SlotState::Stale => stats.missing += 1,
            }
        }
        stats
    }

    /// Release every resolved resource and forget the manifest. In-flight
    /// work finishing later is discarded. Returns the number of resources
    /// released.
    pub fn close(&self) -> usize {
        let slots = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.paths.clear();
            std::mem::take(&mut state.slots)
        };

        let released = slots
            .iter()
            .filter(|s| matches!(s, SlotState::Ready(Slot::Resolved(_))))
            .count();
        drop(slots);

        log::debug!("Released {} cached resources", released);
        released
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════

    /// Look at a slot and start a decrypt if it is absent. With
    /// `only_if_absent`, existing work is reported as `Busy` instead of
    /// being joined.
    fn claim(&self, position: usize, only_if_absent: bool) -> Claim {
        let mut state = self.state.lock();

        match state.slots.get(position) {
            None => return Claim::OutOfRange,
            Some(SlotState::Ready(_) | SlotState::InFlight(_) | SlotState::Stale)
                if only_if_absent =>
            {
                return Claim::Busy
            }
            Some(SlotState::Ready(slot)) => return Claim::Ready(slot.clone()),
            Some(SlotState::Stale) => return Claim::Ready(Slot::Missing),
            Some(SlotState::InFlight(rx)) => return Claim::Waiting(rx.clone()),
            Some(SlotState::Absent) => {}
        }

        let (tx, rx) = watch::channel(None);
        state.slots[position] = SlotState::InFlight(rx.clone());
        let path = state.paths[position].clone();
        let generation = state.generation;
        drop(state);

        self.spawn_decrypt(position, path, generation, tx);
        Claim::Waiting(rx)
    }

    /// Decrypt on a detached task so a caller dropping its future never
    /// strands the slot in flight.
    fn spawn_decrypt(
        &self,
        position: usize,
        path: String,
        generation: u64,
        tx: watch::Sender<Option<Slot>>,
    ) {
        let pipeline = self.pipeline.clone();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let slot = match pipeline.decrypt_asset(&path).await {
                Ok(resource) => Slot::Resolved(Arc::new(resource)),
                Err(e) => {
                    log::warn!("Asset {} unavailable: {}", path, e);
                    Slot::Missing
                }
            };

            let current = {
                let mut state = state.lock();
                if state.generation == generation {
                    state.slots[position] = SlotState::Ready(slot.clone());
                    true
                } else {
                    false
                }
            };

            if current {
                let _ = tx.send(Some(slot));
            } else {
                log::debug!("Discarding stale resolution of {} (generation {})", path, generation);
                let _ = tx.send(Some(Slot::Missing));
            }
        });
    }

    async fn wait(mut rx: watch::Receiver<Option<Slot>>) -> Slot {
        match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone().unwrap_or(Slot::Missing),
            // decrypt task died without reporting
            Err(_) => Slot::Missing,
        }
    }
}
