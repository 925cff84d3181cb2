//! Reveal Gallery - Slideshow Controller
//!
//! Navigation, cross-fades, auto-advance and trigger dispatch for the one
//! open gallery.
//!
//! ```text
//!   Closed ──open──▶ Opening ──▶ Idle(p) ◀──▶ Transitioning(from, to)
//!     ▲                 │           │                  │
//!     └────── close ────┴───────────┴──────────────────┘
//! ```
//!
//! State lives behind one `parking_lot::Mutex` that is never held across an
//! `.await`. Work that outlives a suspension point carries the gallery
//! generation it started under and does nothing once that generation is no
//! longer live.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::cache::{LazyImageCache, LoadPolicy, Slot};
use crate::config::{join_path, CardConfig, Timing};
use crate::error::{GalleryError, GalleryResult};
use crate::gesture::{Swipe, SwipePolicy};
use crate::index::AssetIndex;
use crate::pipeline::DecryptionPipeline;
use crate::schedule::DelayedTask;
use crate::session::SessionContext;
use crate::triggers::TriggerSet;

// ═══════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════

/// Rendering surface of the gallery
pub trait GalleryView: Send + Sync {
    fn show_gallery(&self);
    fn hide_gallery(&self);
    /// Previous / next / close buttons
    fn set_controls_visible(&self, visible: bool);
    /// Replace whatever is displayed with `slot` (Missing shows the
    /// unavailable affordance)
    fn show(&self, position: usize, slot: &Slot);
    /// Start fading `slot` in over the asset at `from`
    fn begin_crossfade(&self, from: usize, to: usize, slot: &Slot, duration: Duration);
    /// Fade done; drop the previous asset
    fn finish_crossfade(&self, to: usize);
    /// Discard the half-built fade target
    fn abort_crossfade(&self, to: usize);
    /// Remove every displayed asset
    fn clear(&self);
}

/// Audio player reached by song triggers
pub trait AudioController: Send + Sync {
    fn play_by_name(&self, name: &str);
}

/// Owner of the view the gallery covers while open
pub trait PresentationHost: Send + Sync {
    fn suppress_main_view(&self);
    fn restore_main_view(&self);
    /// Consulted on close; the tally lives with the host
    fn all_groups_exhausted(&self) -> bool;
}

// ═══════════════════════════════════════════════════════════════════════════
// PUBLIC STATE
// ═══════════════════════════════════════════════════════════════════════════

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryState {
    Closed,
    Opening,
    Idle { position: usize },
    Transitioning { from: usize, to: usize },
}

/// What a navigation request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Shown(usize),
    Closed,
    /// Dropped: transitioning, closed, or stopped at the first asset
    Ignored,
}

/// Parameters of one gallery open
#[derive(Debug, Clone, Default)]
pub struct OpenRequest {
    pub folder: String,
    pub triggers: TriggerSet,
    pub auto_advance: bool,
    pub policy: LoadPolicy,
    pub wrap_around: bool,
    /// Refuse manifests whose names collide after normalization
    pub strict_names: bool,
}

impl OpenRequest {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    pub fn with_triggers(mut self, triggers: impl Into<TriggerSet>) -> Self {
        self.triggers = triggers.into();
        self
    }

    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    pub fn eager(mut self, enabled: bool) -> Self {
        self.policy = if enabled { LoadPolicy::Eager } else { LoadPolicy::Lazy };
        self
    }

    pub fn wrap_around(mut self, enabled: bool) -> Self {
        self.wrap_around = enabled;
        self
    }

    pub fn strict_names(mut self, enabled: bool) -> Self {
        self.strict_names = enabled;
        self
    }
}

/// Read-only copy of the navigation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub folder: String,
    pub len: usize,
    pub current: usize,
    pub transitioning: bool,
    pub wrap_around: bool,
    pub just_opened: bool,
    pub auto_advance_pending: bool,
    /// Manifest entries whose name is shadowed by a later entry
    pub collisions: usize,
}

// ═══════════════════════════════════════════════════════════════════════════
// INTERNAL STATE
// ═══════════════════════════════════════════════════════════════════════════

struct NavigationState {
    current: usize,
    transitioning: bool,
    wrap_around: bool,
    just_opened: bool,
    auto_advance: Option<DelayedTask>,
}

impl NavigationState {
    fn cancel_auto_advance(&mut self) {
        if let Some(task) = self.auto_advance.take() {
            task.cancel();
        }
    }
}

struct Gallery {
    folder: String,
    index: AssetIndex,
    triggers: TriggerSet,
    nav: NavigationState,
    generation: u64,
}

struct ControllerState {
    phase: GalleryState,
    gallery: Option<Gallery>,
    /// Set when the last close found every present opened
    replay_mode: bool,
    /// Bumped by every open and close; an open that wakes up to a different
    /// ticket was closed underneath
    open_ticket: u64,
    /// Gallery UI is up and the host view suppressed
    presented: bool,
}

struct ControllerInner {
    pipeline: DecryptionPipeline,
    cache: LazyImageCache,
    view: Arc<dyn GalleryView>,
    audio: Arc<dyn AudioController>,
    host: Arc<dyn PresentationHost>,
    encrypted_folder: String,
    index_file: String,
    timing: Timing,
    swipe: SwipePolicy,
    state: Mutex<ControllerState>,
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════

/// Slideshow state machine. Cheap to clone; clones drive the same gallery.
#[derive(Clone)]
pub struct SlideshowController {
    inner: Arc<ControllerInner>,
}

impl SlideshowController {
    pub fn new(
        session: &SessionContext,
        config: &CardConfig,
        view: Arc<dyn GalleryView>,
        audio: Arc<dyn AudioController>,
        host: Arc<dyn PresentationHost>,
    ) -> Self {
        let pipeline = DecryptionPipeline::new(session);
        let cache = LazyImageCache::new(pipeline.clone());

        Self {
            inner: Arc::new(ControllerInner {
                pipeline,
                cache,
                view,
                audio,
                host,
                encrypted_folder: config.encrypted_folder.clone(),
                index_file: config.index_file.clone(),
                timing: config.timing,
                swipe: config.timing.swipe_policy(),
                state: Mutex::new(ControllerState {
                    phase: GalleryState::Closed,
                    gallery: None,
                    replay_mode: false,
                    open_ticket: 0,
                    presented: false,
                }),
            }),
        }
    }

    pub fn state(&self) -> GalleryState {
        self.inner.state.lock().phase
    }

    pub fn navigation(&self) -> Option<NavigationSnapshot> {
        let state = self.inner.state.lock();
        state.gallery.as_ref().map(|g| NavigationSnapshot {
            folder: g.folder.clone(),
            len: g.index.len(),
            current: g.nav.current,
            transitioning: g.nav.transitioning,
            wrap_around: g.nav.wrap_around,
            just_opened: g.nav.just_opened,
            auto_advance_pending: g.nav.auto_advance.is_some(),
            collisions: g.index.collisions().len(),
        })
    }

    /// Whether the next open runs in replay mode
    pub fn replay_mode(&self) -> bool {
        self.inner.state.lock().replay_mode
    }

    /// The resource cache of the open gallery
    pub fn cache(&self) -> &LazyImageCache {
        &self.inner.cache
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OPEN
    // ═══════════════════════════════════════════════════════════════════════

    /// Open a gallery folder.
    ///
    /// A manifest failure, or a name collision under `strict_names`, aborts
    /// before any UI changes. After a close that
    /// found every present opened, the request is overridden to wrap
    /// around without auto-advance.
    pub async fn open(&self, mut request: OpenRequest) -> GalleryResult<()> {
        let inner = &self.inner;

        let (ticket, replay) = {
            let mut state = inner.state.lock();
            if state.phase != GalleryState::Closed {
                return Err(GalleryError::GalleryAlreadyOpen);
            }
            state.phase = GalleryState::Opening;
            state.open_ticket += 1;
            (state.open_ticket, state.replay_mode)
        };

        if replay {
            request.wrap_around = true;
            request.auto_advance = false;
        }

        let folder_path = join_path(&inner.encrypted_folder, &request.folder);
        let index_path = join_path(&folder_path, &inner.index_file);

        let manifest = inner
            .pipeline
            .fetch_manifest(&index_path, &folder_path)
            .await
            .and_then(|paths| {
                let index = if request.strict_names {
                    AssetIndex::build_strict(&paths)?
                } else {
                    AssetIndex::build(&paths)
                };
                Ok((paths, index))
            });

        let (paths, index) = match manifest {
            Ok(manifest) => manifest,
            Err(e) => {
                let mut state = inner.state.lock();
                if state.open_ticket == ticket {
                    state.phase = GalleryState::Closed;
                }
                log::error!("Cannot open gallery {}: {}", request.folder, e);
                return Err(e);
            }
        };

        let len = paths.len();
        let opening_cue = request.triggers.opening_cue().map(str::to_string);
        let first_cue = request.triggers.cue_for(0, &index).map(str::to_string);

        let generation = {
            let mut state = inner.state.lock();
            if state.open_ticket != ticket {
                return Err(GalleryError::OpenSuperseded);
            }
            let generation = inner.cache.open(paths);
            state.presented = true;
            state.gallery = Some(Gallery {
                folder: request.folder.clone(),
                index,
                triggers: request.triggers,
                nav: NavigationState {
                    current: 0,
                    transitioning: false,
                    wrap_around: request.wrap_around,
                    just_opened: !replay,
                    auto_advance: None,
                },
                generation,
            });
            generation
        };

        log::info!(
            "Opening gallery {} ({} assets, {:?}{})",
            request.folder,
            len,
            request.policy,
            if replay { ", replay" } else { "" }
        );

        if let Some(song) = opening_cue {
            inner.audio.play_by_name(&song);
        }
        inner.host.suppress_main_view();
        inner.view.show_gallery();
        inner.view.set_controls_visible(false);

        if request.policy == LoadPolicy::Eager {
            let stats = inner.cache.load_all().await;
            log::debug!("Eager load: {:?}", stats);
            if !self.is_live(generation) {
                return Err(GalleryError::OpenSuperseded);
            }
        }

        self.show_position(0, first_cue, generation).await;

        let mut state = inner.state.lock();
        let Some(gallery) = state.gallery.as_mut().filter(|g| g.generation == generation) else {
            return Err(GalleryError::OpenSuperseded);
        };

        if request.auto_advance && len > 1 {
            gallery.nav.transitioning = true;
            gallery.nav.auto_advance = Some(self.schedule_auto_advance(generation));
            state.phase = GalleryState::Transitioning { from: 0, to: 1 };
        } else {
            state.phase = GalleryState::Idle { position: 0 };
            drop(state);
            inner.view.set_controls_visible(true);
        }

        Ok(())
    }

    fn schedule_auto_advance(&self, generation: u64) -> DelayedTask {
        let weak: Weak<ControllerInner> = Arc::downgrade(&self.inner);
        DelayedTask::spawn(self.inner.timing.auto_advance(), generation, async move {
            if let Some(inner) = weak.upgrade() {
                SlideshowController { inner }.auto_advance_fired(generation).await;
            }
        })
    }

    async fn auto_advance_fired(&self, generation: u64) {
        let target = {
            let mut state = self.inner.state.lock();
            let to = match state.phase {
                GalleryState::Transitioning { to, .. } => to,
                _ => return,
            };
            let Some(gallery) = state.gallery.as_mut().filter(|g| g.generation == generation) else {
                return;
            };
            match gallery.nav.auto_advance.take() {
                Some(task) => task.disarm(),
                None => return,
            }
            to
        };

        self.crossfade(target, generation).await;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NAVIGATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Jump to `target`, applying the wrap-around and close-at-end rules.
    /// Dropped while transitioning.
    pub async fn request_show(&self, target: isize) -> NavOutcome {
        let (position, cue, generation) = {
            let mut state = self.inner.state.lock();
            let idle = matches!(state.phase, GalleryState::Idle { .. });
            let Some(gallery) = state.gallery.as_mut() else {
                return NavOutcome::Ignored;
            };
            if !idle || gallery.nav.transitioning {
                log::debug!("Navigation to {} dropped while transitioning", target);
                return NavOutcome::Ignored;
            }

            let len = gallery.index.len() as isize;
            let nav = &mut gallery.nav;
            let position = if target < 0 {
                if nav.wrap_around && !nav.just_opened {
                    Some(len - 1)
                } else {
                    return NavOutcome::Ignored;
                }
            } else if target >= len {
                nav.just_opened = false;
                nav.wrap_around.then_some(0)
            } else {
                Some(target)
            };

            // past the end without wrap-around
            let Some(position) = position else {
                drop(state);
                self.close();
                return NavOutcome::Closed;
            };

            let position = position as usize;
            let previous = nav.current;
            nav.current = position;
            nav.cancel_auto_advance();
            if previous != position {
                self.inner.cache.leave(previous);
            }

            let cue = gallery
                .triggers
                .cue_for(position, &gallery.index)
                .map(str::to_string);
            let generation = gallery.generation;
            state.phase = GalleryState::Idle { position };
            (position, cue, generation)
        };

        self.show_position(position, cue, generation).await;
        NavOutcome::Shown(position)
    }

    pub async fn next(&self) -> NavOutcome {
        match self.current() {
            Some(current) => self.request_show(current as isize + 1).await,
            None => NavOutcome::Ignored,
        }
    }

    pub async fn previous(&self) -> NavOutcome {
        match self.current() {
            Some(current) => self.request_show(current as isize - 1).await,
            None => NavOutcome::Ignored,
        }
    }

    /// Feed a finished swipe (displacement since the gesture started)
    pub async fn handle_swipe(&self, dx: f32, dy: f32) -> NavOutcome {
        match self.inner.swipe.classify(dx, dy) {
            Some(Swipe::Previous) => self.previous().await,
            Some(Swipe::Next) => self.next().await,
            None => NavOutcome::Ignored,
        }
    }

    /// Cross-fade from the current asset to `target`. Dropped unless idle.
    pub async fn fade_transition(&self, target: usize) -> NavOutcome {
        let generation = {
            let mut state = self.inner.state.lock();
            let GalleryState::Idle { position } = state.phase else {
                return NavOutcome::Ignored;
            };
            let Some(gallery) = state.gallery.as_mut() else {
                return NavOutcome::Ignored;
            };
            if target >= gallery.index.len() || gallery.nav.transitioning {
                return NavOutcome::Ignored;
            }
            gallery.nav.transitioning = true;
            gallery.nav.cancel_auto_advance();
            let generation = gallery.generation;
            state.phase = GalleryState::Transitioning {
                from: position,
                to: target,
            };
            generation
        };

        self.inner.view.set_controls_visible(false);
        self.crossfade(target, generation).await
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CLOSE
    // ═══════════════════════════════════════════════════════════════════════

    /// Close button: ignored while transitioning
    pub fn request_close(&self) -> bool {
        if matches!(self.state(), GalleryState::Transitioning { .. }) {
            log::debug!("Close dropped while transitioning");
            return false;
        }
        self.close()
    }

    /// Tear the gallery down from any open state. Returns `false` when
    /// already closed.
    pub fn close(&self) -> bool {
        let inner = &self.inner;

        let (gallery, presented) = {
            let mut state = inner.state.lock();
            if state.phase == GalleryState::Closed {
                return false;
            }
            state.phase = GalleryState::Closed;
            state.open_ticket += 1;
            let presented = std::mem::replace(&mut state.presented, false);
            (state.gallery.take(), presented)
        };

        let folder = match gallery {
            Some(mut gallery) => {
                gallery.nav.cancel_auto_advance();
                gallery.folder
            }
            None => String::new(),
        };

        if !presented {
            log::info!("Gallery open cancelled");
            return true;
        }

        inner.view.set_controls_visible(false);
        inner.view.hide_gallery();
        let released = inner.cache.close();
        inner.host.restore_main_view();

        let exhausted = inner.host.all_groups_exhausted();
        inner.state.lock().replay_mode = exhausted;

        log::info!(
            "Closed gallery {} ({} resources released{})",
            folder,
            released,
            if exhausted { ", all presents opened" } else { "" }
        );
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════

    fn current(&self) -> Option<usize> {
        self.inner.state.lock().gallery.as_ref().map(|g| g.nav.current)
    }

    fn is_live(&self, generation: u64) -> bool {
        self.inner
            .state
            .lock()
            .gallery
            .as_ref()
            .map_or(false, |g| g.generation == generation)
    }

    fn is_showing(&self, generation: u64, position: usize) -> bool {
        self.inner
            .state
            .lock()
            .gallery
            .as_ref()
            .map_or(false, |g| g.generation == generation && g.nav.current == position)
    }

    /// Display `position` once resolved. The caller has already made it
    /// current.
    async fn show_position(&self, position: usize, cue: Option<String>, generation: u64) {
        let inner = &self.inner;

        if let Some(song) = cue {
            inner.audio.play_by_name(&song);
        }
        inner.view.clear();

        let slot = inner.cache.reattempt(position).await;
        if !self.is_showing(generation, position) {
            log::debug!("Position {} no longer current, not displaying", position);
            return;
        }

        if slot.is_missing() {
            log::warn!("Asset at position {} unavailable", position);
        }
        inner.view.show(position, &slot);
        inner.cache.preload(position);
    }

    /// Fade body; the gallery is already marked transitioning.
    async fn crossfade(&self, target: usize, generation: u64) -> NavOutcome {
        let inner = &self.inner;
        let from = match self.current() {
            Some(from) => from,
            None => return NavOutcome::Ignored,
        };

        let slot = inner.cache.reattempt(target).await;
        if !self.is_live(generation) {
            return NavOutcome::Ignored;
        }

        if slot.is_missing() {
            log::warn!("Fade to position {} aborted: asset unavailable", target);
            inner.view.abort_crossfade(target);
            self.settle(generation, from);
            inner.view.set_controls_visible(true);
            return NavOutcome::Ignored;
        }

        inner.view.begin_crossfade(from, target, &slot, inner.timing.fade());

        let cue = {
            let mut state = inner.state.lock();
            let Some(gallery) = state.gallery.as_mut().filter(|g| g.generation == generation) else {
                return NavOutcome::Ignored;
            };
            gallery.nav.current = target;
            gallery
                .triggers
                .cue_for(target, &gallery.index)
                .map(str::to_string)
        };
        if from != target {
            inner.cache.leave(from);
        }
        if let Some(song) = cue {
            inner.audio.play_by_name(&song);
        }

        tokio::time::sleep(inner.timing.fade()).await;
        if !self.is_live(generation) {
            return NavOutcome::Ignored;
        }

        inner.view.finish_crossfade(target);
        self.settle(generation, target);
        inner.view.set_controls_visible(true);
        inner.cache.preload(target);
        NavOutcome::Shown(target)
    }

    /// Leave `Transitioning` for `Idle(position)`
    fn settle(&self, generation: u64, position: usize) {
        let mut state = self.inner.state.lock();
        if let Some(gallery) = state.gallery.as_mut().filter(|g| g.generation == generation) {
            gallery.nav.transitioning = false;
            gallery.nav.current = position;
            state.phase = GalleryState::Idle { position };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        add_folder, sealed_gallery, yield_many, CountingSource, GatedSource, RecordingAudio, RecordingHost,
        RecordingView, ViewEvent,
    };
    use crate::triggers::TriggerRule;

    struct Harness {
        controller: SlideshowController,
        view: Arc<RecordingView>,
        audio: Arc<RecordingAudio>,
        host: Arc<RecordingHost>,
        source: Arc<CountingSource>,
        session: SessionContext,
    }

    fn harness(names: &[&str]) -> Harness {
        let (source, session) = sealed_gallery("Bass", names);
        build(source, session)
    }

    /// Harness whose fetches can be held open
    fn gated_harness(names: &[&str]) -> (Harness, Arc<GatedSource>) {
        let (source, session) = sealed_gallery("Bass", names);
        let gated = Arc::new(GatedSource::new(source.clone()));
        let session = SessionContext::new(session.key(), gated.clone(), session.cipher());
        (build(source, session), gated)
    }

    fn build(source: Arc<CountingSource>, session: SessionContext) -> Harness {
        let config = CardConfig {
            encrypted_folder: String::new(),
            ..CardConfig::default()
        };
        let view = Arc::new(RecordingView::default());
        let audio = Arc::new(RecordingAudio::default());
        let host = Arc::new(RecordingHost::default());
        let controller = SlideshowController::new(&session, &config, view.clone(), audio.clone(), host.clone());

        Harness {
            controller,
            view,
            audio,
            host,
            source,
            session,
        }
    }

    fn shown(position: usize, name: &str) -> ViewEvent {
        ViewEvent::Show(position, format!("photo:{}", name))
    }

    fn displayed_anything(events: &[ViewEvent]) -> bool {
        events
            .iter()
            .any(|e| matches!(e, ViewEvent::Show(..) | ViewEvent::ShowMissing(_)))
    }

    const ABC: [&str; 3] = ["a.bin", "b.bin", "c.bin"];

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_then_close_past_end() {
        let h = harness(&ABC);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        assert_eq!(h.controller.state(), GalleryState::Transitioning { from: 0, to: 1 });
        assert!(h.view.events().contains(&shown(0, "a.bin")));
        assert_eq!(h.view.controls_visible(), Some(false));
        assert!(h.controller.navigation().unwrap().auto_advance_pending);

        tokio::time::sleep(Duration::from_millis(6010)).await;
        yield_many().await;

        assert_eq!(h.controller.state(), GalleryState::Idle { position: 1 });
        assert_eq!(h.view.controls_visible(), Some(true));
        let events = h.view.events();
        assert!(events.contains(&ViewEvent::BeginCrossfade { from: 0, to: 1 }));
        assert!(events.contains(&ViewEvent::FinishCrossfade(1)));
        assert!(!h.controller.navigation().unwrap().auto_advance_pending);

        assert_eq!(h.controller.request_show(5).await, NavOutcome::Closed);
        assert_eq!(h.controller.state(), GalleryState::Closed);
        assert_eq!(h.view.events().last(), Some(&ViewEvent::HideGallery));
        assert_eq!(*h.host.suppressed.lock(), 1);
        assert_eq!(*h.host.restored.lock(), 1);
        assert_eq!(h.host.queries(), 1);
        assert!(h.controller.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_dropped_while_transitioning() {
        let h = harness(&ABC);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        let before = h.controller.navigation();
        let events_before = h.view.events().len();

        assert_eq!(h.controller.next().await, NavOutcome::Ignored);
        assert_eq!(h.controller.previous().await, NavOutcome::Ignored);
        assert_eq!(h.controller.request_show(2).await, NavOutcome::Ignored);
        assert_eq!(h.controller.handle_swipe(-120.0, 3.0).await, NavOutcome::Ignored);
        assert!(!h.controller.request_close());

        assert_eq!(h.controller.navigation(), before);
        assert_eq!(h.view.events().len(), events_before);
        assert_eq!(h.controller.state(), GalleryState::Transitioning { from: 0, to: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_asset_never_auto_advances() {
        let h = harness(&["a.bin"]);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        assert_eq!(h.controller.state(), GalleryState::Idle { position: 0 });
        assert_eq!(h.view.controls_visible(), Some(true));
        assert!(!h.controller.navigation().unwrap().auto_advance_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrap_off_stops_at_first_and_closes_at_end() {
        let h = harness(&ABC);
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();

        assert_eq!(h.controller.request_show(-1).await, NavOutcome::Ignored);
        assert_eq!(h.controller.state(), GalleryState::Idle { position: 0 });

        assert_eq!(h.controller.request_show(2).await, NavOutcome::Shown(2));
        assert!(h.view.events().contains(&shown(2, "c.bin")));
        assert_eq!(h.controller.next().await, NavOutcome::Closed);
        assert_eq!(h.controller.state(), GalleryState::Closed);
        assert!(h.controller.navigation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrap_on_honours_just_opened() {
        let h = harness(&ABC);
        h.controller
            .open(OpenRequest::new("Bass").wrap_around(true))
            .await
            .unwrap();

        // fresh gallery: no wrapping backwards yet
        assert_eq!(h.controller.previous().await, NavOutcome::Ignored);

        assert_eq!(h.controller.request_show(3).await, NavOutcome::Shown(0));
        assert!(!h.controller.navigation().unwrap().just_opened);

        assert_eq!(h.controller.request_show(-1).await, NavOutcome::Shown(2));
        assert_eq!(h.controller.state(), GalleryState::Idle { position: 2 });
        assert!(h.view.events().contains(&shown(2, "c.bin")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_asset_shows_missing_and_retries_on_reentry() {
        let h = harness(&ABC);
        h.source.corrupt("Bass/b.bin");
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();

        assert!(h.controller.cache().resolve(1).await.is_missing());
        let fetched = h.source.fetches("Bass/b.bin");
        assert_eq!(fetched, 1);

        assert_eq!(h.controller.request_show(1).await, NavOutcome::Shown(1));
        assert_eq!(h.controller.navigation().unwrap().current, 1);
        assert_eq!(h.view.events().last(), Some(&ViewEvent::ShowMissing(1)));
        assert_eq!(h.source.fetches("Bass/b.bin"), 1);

        // nothing retries in the background
        tokio::time::sleep(Duration::from_secs(30)).await;
        yield_many().await;
        assert_eq!(h.source.fetches("Bass/b.bin"), 1);

        assert_eq!(h.controller.previous().await, NavOutcome::Shown(0));
        yield_many().await;
        assert_eq!(h.source.fetches("Bass/b.bin"), 1);

        assert_eq!(h.controller.next().await, NavOutcome::Shown(1));
        assert_eq!(h.source.fetches("Bass/b.bin"), 2);
        assert_eq!(h.view.events().last(), Some(&ViewEvent::ShowMissing(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_to_missing_aborts_and_keeps_position() {
        let h = harness(&ABC);
        h.source.corrupt("Bass/b.bin");
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3010)).await;
        yield_many().await;

        assert_eq!(h.controller.state(), GalleryState::Idle { position: 0 });
        assert_eq!(h.controller.navigation().unwrap().current, 0);
        let events = h.view.events();
        assert!(events.contains(&ViewEvent::AbortCrossfade(1)));
        assert!(!events.iter().any(|e| matches!(e, ViewEvent::BeginCrossfade { .. })));
        assert_eq!(h.view.controls_visible(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_fade_transition() {
        let h = harness(&ABC);
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();

        let fade = h.controller.clone();
        let task = tokio::spawn(async move { fade.fade_transition(2).await });
        yield_many().await;
        assert_eq!(h.controller.state(), GalleryState::Transitioning { from: 0, to: 2 });
        assert_eq!(h.controller.next().await, NavOutcome::Ignored);

        assert_eq!(task.await.unwrap(), NavOutcome::Shown(2));
        assert_eq!(h.controller.state(), GalleryState::Idle { position: 2 });
        assert_eq!(h.controller.fade_transition(7).await, NavOutcome::Ignored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_first_match_wins() {
        let h = harness(&ABC);
        let triggers = vec![
            TriggerRule::PhotoOnly { photo: "b".into() },
            TriggerRule::PhotoAndSong {
                photo: "B.bin".into(),
                song: "first.mp3".into(),
            },
            TriggerRule::SongOnly { song: "opening.mp3".into() },
            TriggerRule::PhotoAndSong {
                photo: "b".into(),
                song: "second.mp3".into(),
            },
        ];
        h.controller
            .open(OpenRequest::new("Bass").with_triggers(triggers))
            .await
            .unwrap();
        assert_eq!(h.audio.played(), vec!["opening.mp3".to_string()]);

        h.controller.next().await;
        h.controller.next().await;
        assert_eq!(h.audio.played(), vec!["opening.mp3".to_string(), "first.mp3".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fade_fires_trigger_for_target() {
        let h = harness(&ABC);
        let triggers = vec![TriggerRule::PhotoAndSong {
            photo: "b".into(),
            song: "b-song.mp3".into(),
        }];
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true).with_triggers(triggers))
            .await
            .unwrap();
        assert!(h.audio.played().is_empty());

        tokio::time::sleep(Duration::from_millis(6010)).await;
        yield_many().await;
        assert_eq!(h.audio.played(), vec!["b-song.mp3".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_auto_advance() {
        let h = harness(&ABC);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        assert!(h.controller.close());
        h.view.take();

        tokio::time::sleep(Duration::from_secs(10)).await;
        yield_many().await;
        assert!(h.view.events().is_empty());
        assert_eq!(h.controller.state(), GalleryState::Closed);
        assert!(!h.controller.close());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_mode_after_all_presents_opened() {
        let h = harness(&ABC);
        h.host.set_exhausted(true);
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        assert!(h.controller.request_close());
        assert!(h.controller.replay_mode());

        h.host.set_exhausted(false);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        let nav = h.controller.navigation().unwrap();
        assert!(nav.wrap_around);
        assert!(!nav.just_opened);
        assert!(!nav.auto_advance_pending);
        assert_eq!(h.controller.previous().await, NavOutcome::Shown(2));

        h.controller.close();
        assert!(!h.controller.replay_mode());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manifest_error_leaves_ui_untouched() {
        let h = harness(&ABC);
        let err = h.controller.open(OpenRequest::new("Nope")).await.unwrap_err();

        assert!(matches!(err, GalleryError::Manifest(_)));
        assert!(err.aborts_open());
        assert_eq!(h.controller.state(), GalleryState::Closed);
        assert!(h.view.events().is_empty());
        assert!(h.audio.played().is_empty());
        assert_eq!(*h.host.suppressed.lock(), 0);

        // still usable afterwards
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        assert!(matches!(
            h.controller.open(OpenRequest::new("Bass")).await,
            Err(GalleryError::GalleryAlreadyOpen)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eager_open_resolves_everything_first() {
        let h = harness(&ABC);
        h.source.corrupt("Bass/c.bin");
        h.controller
            .open(OpenRequest::new("Bass").eager(true))
            .await
            .unwrap();

        let stats = h.controller.cache().stats();
        assert_eq!((stats.resolved, stats.missing), (2, 1));
        for name in ABC {
            assert_eq!(h.source.fetches(&format!("Bass/{}", name)), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_uses_fresh_cache() {
        let h = harness(&ABC);
        add_folder(&h.source, &h.session.key(), "Grinch", &["x.bin", "y.bin"]);

        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        h.controller.close();
        h.controller.open(OpenRequest::new("Grinch")).await.unwrap();

        let nav = h.controller.navigation().unwrap();
        assert_eq!((nav.folder.as_str(), nav.len, nav.current), ("Grinch", 2, 0));
        assert!(h.view.events().contains(&shown(0, "x.bin")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_swipe_policy() {
        let h = harness(&ABC);
        h.controller.open(OpenRequest::new("Bass")).await.unwrap();

        assert_eq!(h.controller.handle_swipe(-10.0, 0.0).await, NavOutcome::Ignored);
        assert_eq!(h.controller.handle_swipe(-80.0, 100.0).await, NavOutcome::Ignored);
        assert_eq!(h.controller.handle_swipe(-80.0, 4.0).await, NavOutcome::Shown(1));
        assert_eq!(h.controller.handle_swipe(80.0, 4.0).await, NavOutcome::Shown(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_manifest_pending_supersedes_open() {
        let (h, gated) = gated_harness(&ABC);
        gated.hold("Bass/index.json");

        let opener = h.controller.clone();
        let opening = tokio::spawn(async move { opener.open(OpenRequest::new("Bass")).await });
        yield_many().await;
        assert_eq!(h.controller.state(), GalleryState::Opening);

        assert!(h.controller.close());
        assert_eq!(h.controller.state(), GalleryState::Closed);
        gated.release("Bass/index.json");

        let result = opening.await.unwrap();
        assert!(matches!(result, Err(GalleryError::OpenSuperseded)));
        assert!(h.view.events().is_empty());
        assert_eq!(*h.host.suppressed.lock(), 0);
        assert_eq!(h.host.queries(), 0);
        assert!(h.controller.cache().is_empty());

        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        assert_eq!(h.controller.state(), GalleryState::Idle { position: 0 });
        assert!(h.view.events().contains(&shown(0, "a.bin")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_first_asset_resolving() {
        let (h, gated) = gated_harness(&ABC);
        gated.hold("Bass/a.bin");

        let opener = h.controller.clone();
        let opening = tokio::spawn(async move { opener.open(OpenRequest::new("Bass")).await });
        yield_many().await;
        assert_eq!(h.controller.state(), GalleryState::Opening);
        assert!(h.view.events().contains(&ViewEvent::ShowGallery));

        assert!(h.controller.close());
        gated.release("Bass/a.bin");

        let result = opening.await.unwrap();
        assert!(matches!(result, Err(GalleryError::OpenSuperseded)));
        yield_many().await;

        let events = h.view.events();
        assert!(!displayed_anything(&events));
        assert_eq!(events.last(), Some(&ViewEvent::HideGallery));
        assert_eq!(*h.host.restored.lock(), 1);
        assert!(h.controller.cache().is_empty());
        assert_eq!(h.controller.state(), GalleryState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_during_eager_load_abandons_it() {
        let (h, gated) = gated_harness(&ABC);
        gated.hold("Bass/b.bin");

        let opener = h.controller.clone();
        let opening = tokio::spawn(async move { opener.open(OpenRequest::new("Bass").eager(true)).await });
        yield_many().await;
        assert_eq!(h.controller.state(), GalleryState::Opening);

        assert!(h.controller.close());
        gated.release("Bass/b.bin");

        let result = opening.await.unwrap();
        assert!(matches!(result, Err(GalleryError::OpenSuperseded)));
        yield_many().await;

        assert!(!displayed_anything(&h.view.events()));
        assert_eq!(h.source.fetches("Bass/c.bin"), 0);
        assert!(h.controller.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_mid_fade_discards_the_rest_of_it() {
        let h = harness(&ABC);
        h.controller
            .open(OpenRequest::new("Bass").auto_advance(true))
            .await
            .unwrap();

        // timer fired at 3s, fade runs until 6s
        tokio::time::sleep(Duration::from_millis(4000)).await;
        yield_many().await;
        assert_eq!(h.controller.state(), GalleryState::Transitioning { from: 0, to: 1 });
        assert!(h.view.events().contains(&ViewEvent::BeginCrossfade { from: 0, to: 1 }));

        assert!(h.controller.close());
        h.view.take();

        tokio::time::sleep(Duration::from_secs(5)).await;
        yield_many().await;
        assert!(h.view.events().is_empty());
        assert_eq!(h.controller.state(), GalleryState::Closed);

        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        assert_eq!(h.controller.state(), GalleryState::Idle { position: 0 });
        assert_eq!(h.view.controls_visible(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_name_collisions_reported_or_refused() {
        let h = harness(&["a.jpg.bin", "b.bin", "A.png.bin"]);

        let err = h
            .controller
            .open(OpenRequest::new("Bass").strict_names(true))
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::NameCollision { first: 0, second: 2, .. }));
        assert!(err.aborts_open());
        assert_eq!(h.controller.state(), GalleryState::Closed);
        assert!(h.view.events().is_empty());

        h.controller.open(OpenRequest::new("Bass")).await.unwrap();
        assert_eq!(h.controller.navigation().unwrap().collisions, 1);
    }
}
