/// SphereTreeNode: one bounding sphere living in the tree's node pool.
///
/// A node is either a leaf (wraps one external object), a super sphere
/// (encloses a group of leaves) or the root. The structural kind is fixed
/// when the node is initialized; transient bookkeeping lives in `flags`.
///
/// Links to parent, children and siblings are pool handles, so the child
/// list is an intrusive doubly-linked list threaded through the pool.

use bitflags::bitflags;
use glam::Vec3;
use crate::math::BoundingSphere;
use crate::utils::PoolHandle;
use super::visibility::UserData;

/// Handle to a node stored in the sphere tree
pub type NodeHandle = PoolHandle;

/// Structural role of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    /// Wraps one external object
    #[default]
    Leaf,
    /// Synthesized to enclose a group of leaves
    SuperSphere,
    /// Top of the hierarchy, never removed
    Root,
}

bitflags! {
    /// Transient per-node state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Queued in the recompute FIFO
        const NEEDS_RECOMPUTE = 0b0000_0001;
        /// Queued for (re-)integration into the hierarchy
        const NEEDS_INTEGRATE = 0b0000_0010;
        /// Cached static-visibility leaves are stale
        const UPDATE_LEAVES   = 0b0000_0100;
    }
}

bitflags! {
    /// Frame-coherence state of a node for one visibility set
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VisFlags: u8 {
        const HIDDEN  = 0b0000_0001;
        const PARTIAL = 0b0000_0010;
        const INSIDE  = 0b0000_0100;
    }
}

#[derive(Debug, Default)]
pub struct SphereTreeNode {
    pub(crate) sphere: BoundingSphere,
    pub(crate) kind: NodeKind,
    pub(crate) flags: NodeFlags,
    /// One entry per registered visibility set, in registration order
    pub(crate) vis_flags: Vec<VisFlags>,

    pub(crate) parent: Option<NodeHandle>,
    pub(crate) first_child: Option<NodeHandle>,
    pub(crate) next_sibling: Option<NodeHandle>,
    pub(crate) previous_sibling: Option<NodeHandle>,
    pub(crate) child_count: u32,

    /// Squared distance the center may drift from the parent center
    /// before the sphere pierces its parent
    pub(crate) binding_distance_sq: f32,
    pub(crate) user_data: Option<UserData>,

    /// Cell index in the recompute FIFO while queued
    pub(crate) recompute_slot: Option<usize>,
    /// Cell index in the integrate FIFO while queued
    pub(crate) integrate_slot: Option<usize>,

    /// Static visibility leaves touched by the sphere
    pub(crate) static_leaves: Vec<u32>,
}

impl SphereTreeNode {
    /// Reset every field for reuse.
    ///
    /// Pool slots are recycled, so the vectors keep their allocations.
    pub(crate) fn initialize(
        &mut self,
        kind: NodeKind,
        center: Vec3,
        radius: f32,
        user_data: Option<UserData>,
        visibility_set_count: usize,
    ) {
        self.sphere = BoundingSphere::new(center, radius);
        self.kind = kind;
        self.flags = NodeFlags::empty();
        self.vis_flags.clear();
        self.vis_flags.resize(visibility_set_count, VisFlags::empty());
        self.parent = None;
        self.first_child = None;
        self.next_sibling = None;
        self.previous_sibling = None;
        self.child_count = 0;
        self.binding_distance_sq = 0.0;
        self.user_data = user_data;
        self.recompute_slot = None;
        self.integrate_slot = None;
        self.static_leaves.clear();
    }

    /// Compute the squared binding distance against a parent of `parent_radius`.
    ///
    /// Clamped to zero when the node is as large as its parent, so any
    /// movement at all detaches it.
    pub(crate) fn compute_binding_distance(&mut self, parent_radius: f32) {
        let distance = parent_radius - self.sphere.radius;
        self.binding_distance_sq = if distance <= 0.0 { 0.0 } else { distance * distance };
    }

    // ===== ACCESSORS =====

    pub fn sphere(&self) -> &BoundingSphere {
        &self.sphere
    }

    pub fn center(&self) -> Vec3 {
        self.sphere.center
    }

    pub fn radius(&self) -> f32 {
        self.sphere.radius
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    pub fn is_super_sphere(&self) -> bool {
        self.kind == NodeKind::SuperSphere
    }

    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::Root
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Coherence state for the set at `set_index` (registration order)
    pub fn vis_flags(&self, set_index: usize) -> VisFlags {
        self.vis_flags.get(set_index).copied().unwrap_or_default()
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn first_child(&self) -> Option<NodeHandle> {
        self.first_child
    }

    pub fn next_sibling(&self) -> Option<NodeHandle> {
        self.next_sibling
    }

    pub fn previous_sibling(&self) -> Option<NodeHandle> {
        self.previous_sibling
    }

    pub fn child_count(&self) -> u32 {
        self.child_count
    }

    pub fn binding_distance_sq(&self) -> f32 {
        self.binding_distance_sq
    }

    pub fn user_data(&self) -> Option<UserData> {
        self.user_data
    }

    pub fn static_leaves(&self) -> &[u32] {
        &self.static_leaves
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
