//! Reveal Gallery - Asset Index
//!
//! Maps normalized asset names to manifest positions. This is the join key
//! between a trigger rule's photo name and the slot it lives in.

use std::collections::HashMap;

use crate::error::{GalleryError, GalleryResult};

/// Normalize an asset or photo name: keep the final path segment, cut
/// everything from the first `.` onward, lowercase.
///
/// `"Photos/Bass/IMG_2559.JPEG.bin"` becomes `"img_2559"`.
pub fn normalize_name(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    let stem = match base.find('.') {
        Some(dot) => &base[..dot],
        None => base,
    };
    stem.to_lowercase()
}

/// Two manifest entries that normalize to the same name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    /// Position that lost the mapping
    pub first: usize,
    /// Position the name now resolves to
    pub second: usize,
}

/// Normalized name → position map for one manifest
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    positions: HashMap<String, usize>,
    collisions: Vec<NameCollision>,
    len: usize,
}

impl AssetIndex {
    /// Build the index in manifest order.
    ///
    /// On a collision the later entry wins the name, and the collision is
    /// recorded and logged. The earlier position stays reachable by
    /// navigation but no trigger can address it.
    pub fn build<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut positions = HashMap::with_capacity(paths.len());
        let mut collisions = Vec::new();

        for (idx, path) in paths.iter().enumerate() {
            let name = normalize_name(path.as_ref());
            if let Some(previous) = positions.insert(name.clone(), idx) {
                log::warn!(
                    "Asset name '{}' at position {} shadows position {}",
                    name,
                    idx,
                    previous
                );
                collisions.push(NameCollision {
                    name,
                    first: previous,
                    second: idx,
                });
            }
        }

        Self {
            positions,
            collisions,
            len: paths.len(),
        }
    }

    /// Build the index, failing on the first collision
    pub fn build_strict<S: AsRef<str>>(paths: &[S]) -> GalleryResult<Self> {
        let index = Self::build(paths);
        match index.collisions.first() {
            Some(c) => Err(GalleryError::NameCollision {
                name: c.name.clone(),
                first: c.first,
                second: c.second,
            }),
            None => Ok(index),
        }
    }

    /// Position for a name; the name is normalized first
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_name(name)).copied()
    }

    /// Collisions found while building
    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }

    /// Number of manifest entries indexed
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct names
    pub fn names(&self) -> usize {
        self.positions.len()
    }
}
