//! Reveal Gallery - Swipe Gestures
//!
//! Turns pointer/touch displacement into navigation. Only the horizontal
//! and vertical displacement since the gesture started matter.

/// Navigation requested by a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    /// Finger moved right
    Previous,
    /// Finger moved left
    Next,
}

/// Default minimum horizontal travel, in pixels
pub const DEFAULT_SWIPE_MIN_PX: f32 = 30.0;

/// Swipe classification policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipePolicy {
    min_px: f32,
}

impl Default for SwipePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SWIPE_MIN_PX)
    }
}

impl SwipePolicy {
    pub fn new(min_px: f32) -> Self {
        Self { min_px: min_px.abs() }
    }

    pub fn min_px(&self) -> f32 {
        self.min_px
    }

    /// A swipe needs `|dx| > min` and more horizontal than vertical travel
    pub fn classify(&self, dx: f32, dy: f32) -> Option<Swipe> {
        if !dx.is_finite() || !dy.is_finite() {
            return None;
        }
        if dx.abs() <= self.min_px || dx.abs() <= dy.abs() {
            return None;
        }
        Some(if dx > 0.0 { Swipe::Previous } else { Swipe::Next })
    }
}

/// Pairs gesture start and end coordinates
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    policy: SwipePolicy,
    start: Option<(f32, f32)>,
}

impl GestureTracker {
    pub fn new(policy: SwipePolicy) -> Self {
        Self { policy, start: None }
    }

    pub fn begin(&mut self, x: f32, y: f32) {
        self.start = Some((x, y));
    }

    /// End the gesture. Without a matching `begin` nothing happens.
    pub fn end(&mut self, x: f32, y: f32) -> Option<Swipe> {
        let (sx, sy) = self.start.take()?;
        self.policy.classify(x - sx, y - sy)
    }
}
