/// Visibility collaborators of the sphere tree.
///
/// - `VisibilitySet` → receives the objects a frustum query finds visible
/// - `StaticVisTree` → optional precomputed potentially-visible-set (PVS)
///   structure used to reject objects hidden behind static geometry
///
/// Both are implemented by the embedding engine. `ObjectVisibilitySet` is a
/// ready-made accumulator keyed by `UserData`.

use bitflags::bitflags;
use glam::Vec3;
use rustc_hash::FxHashMap;
use slotmap::new_key_type;
use crate::math::{BoundingSphere, FrustumTest};

new_key_type! {
    /// Stable key for a visibility set registered with a sphere tree
    pub struct VisibilitySetKey;
}

/// Opaque identifier of the external object a leaf stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserData(pub u64);

bitflags! {
    /// Options for a visibility query
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchFlags: u32 {
        /// Ignore the static PVS, classify against the frustum only
        const SKIP_STATIC_VISIBILITY = 0b0000_0001;
    }
}

/// Accumulator of visibility query results.
///
/// The tree is frame coherent: `insert` is called when an object becomes
/// visible or switches between `Inside` and `Partial`, `remove` when it
/// leaves the frustum. Objects whose state did not change are not reported.
pub trait VisibilitySet {
    fn insert(&mut self, user_data: UserData, state: FrustumTest);
    fn remove(&mut self, user_data: UserData);
}

/// Default visibility accumulator: visible objects and their classification.
#[derive(Debug, Default)]
pub struct ObjectVisibilitySet {
    objects: FxHashMap<UserData, FrustumTest>,
}

impl ObjectVisibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, user_data: UserData) -> bool {
        self.objects.contains_key(&user_data)
    }

    /// Last reported classification (`Inside` or `Partial`) of a visible object
    pub fn state(&self, user_data: UserData) -> Option<FrustumTest> {
        self.objects.get(&user_data).copied()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (UserData, FrustumTest)> + '_ {
        self.objects.iter().map(|(&user_data, &state)| (user_data, state))
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

impl VisibilitySet for ObjectVisibilitySet {
    fn insert(&mut self, user_data: UserData, state: FrustumTest) {
        self.objects.insert(user_data, state);
    }

    fn remove(&mut self, user_data: UserData) {
        self.objects.remove(&user_data);
    }
}

/// Static visibility structure (BSP tree with PVS data or similar).
///
/// Leaves are identified by index. Each leaf has a PVS row: a bit set over
/// all leaves, bit `n` set when leaf `n` is potentially visible from it.
pub trait StaticVisTree {
    /// Leaf containing `point`, `None` for solid space or outside the tree
    fn find_leaf(&self, point: Vec3) -> Option<u32>;

    /// PVS row of `leaf`
    fn pvs_row(&self, leaf: u32) -> Option<&[u8]>;

    /// Replace `leaves` with every empty leaf the sphere touches
    fn find_leaves(&self, sphere: &BoundingSphere, leaves: &mut Vec<u32>);
}

/// Test bit `leaf` of a PVS row. Bits past the end of the row read as unset.
pub fn pvs_bit(row: &[u8], leaf: u32) -> bool {
    row.get((leaf >> 3) as usize)
        .is_some_and(|byte| byte & (1 << (leaf & 7)) != 0)
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
