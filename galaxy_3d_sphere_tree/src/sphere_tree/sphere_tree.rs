/// SphereTree: dynamic hierarchy of bounding spheres.
///
/// Leaves wrap external objects. They are grouped under super spheres, which
/// all hang off a single root sphere centered at the origin. Moving a leaf is
/// cheap: as long as it stays within its binding distance nothing else
/// happens. Once it pierces its parent it is detached, parked under the root
/// and queued for re-integration, and the parent is queued for a shrink.
/// Both queues are drained by `process()`, typically once per frame.
///
/// All nodes (leaves and super spheres) live in a fixed-capacity pool sized
/// to twice `max_spheres`. The tree never allocates nodes after construction.
///
/// Visibility queries are frame coherent: registered visibility sets only
/// hear about objects whose classification changed since the previous query
/// for that set (see `culling.rs`).

use rustc_hash::FxHashSet;
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::math::BoundingSphere;
use crate::utils::{Fifo, Pool};
use crate::{engine_bail, engine_debug, engine_error, engine_info, engine_trace, engine_warn};
use super::config::SphereTreeConfig;
use super::node::{NodeFlags, NodeHandle, NodeKind, SphereTreeNode, VisFlags};
use super::visibility::{
    ObjectVisibilitySet, StaticVisTree, UserData, VisibilitySet, VisibilitySetKey,
};

/// Result of recomputing a super sphere from its children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    /// No children left, the node should be removed
    Empty,
    /// Sphere kept as is (root, or a tighter fit was not smaller)
    Unchanged,
    /// Sphere moved and shrank
    Changed,
}

/// Work done by one `SphereTree::process()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessStats {
    /// Super spheres recomputed
    pub recomputed: usize,
    /// Nodes released to the pool (empty super spheres)
    pub removed: usize,
    /// Leaves re-integrated
    pub integrated: usize,
    /// Recompute requests pushed back to the next call
    pub deferred: usize,
}

pub struct SphereTree<V: VisibilitySet = ObjectVisibilitySet> {
    pub(crate) config: SphereTreeConfig,
    pub(crate) nodes: Pool<SphereTreeNode>,
    pub(crate) recompute_fifo: Fifo<NodeHandle>,
    pub(crate) integrate_fifo: Fifo<NodeHandle>,
    pub(crate) root: NodeHandle,
    pub(crate) visibility_sets: SlotMap<VisibilitySetKey, V>,
    /// Registration order; position = index into each node's `vis_flags`
    pub(crate) visibility_order: Vec<VisibilitySetKey>,
    pub(crate) static_vis_tree: Option<Box<dyn StaticVisTree>>,
}

impl<V: VisibilitySet> SphereTree<V> {
    /// Create a tree able to hold `max_spheres` leaves.
    ///
    /// # Arguments
    ///
    /// * `max_spheres` - Leaf capacity (the node pool holds twice as many nodes)
    /// * `max_leaf_size` - Largest radius a super sphere may grow to when absorbing a leaf
    /// * `padding` - Slack added around super spheres
    /// * `static_vis_tree` - Optional PVS structure used to reject occluded leaves
    pub fn new(
        max_spheres: usize,
        max_leaf_size: f32,
        padding: f32,
        static_vis_tree: Option<Box<dyn StaticVisTree>>,
    ) -> Result<Self> {
        Self::with_config(
            SphereTreeConfig::new(max_spheres, max_leaf_size, padding),
            static_vis_tree,
        )
    }

    pub fn with_config(
        config: SphereTreeConfig,
        static_vis_tree: Option<Box<dyn StaticVisTree>>,
    ) -> Result<Self> {
        if let Err(err) = config.validate() {
            engine_error!("galaxy3d::SphereTree", "{}", err);
            return Err(err);
        }

        let capacity = config.pool_capacity();
        let mut nodes: Pool<SphereTreeNode> = Pool::new(capacity);
        let recompute_fifo = Fifo::new(capacity);
        let integrate_fifo = Fifo::new(capacity);

        // Every queued entry is a live pooled node, so a queue as large as the
        // pool can only overflow through tombstones
        if recompute_fifo.capacity() < nodes.capacity() || integrate_fifo.capacity() < nodes.capacity() {
            return Err(Error::InitializationFailed(format!(
                "work queues ({} cells) smaller than the node pool ({} slots)",
                recompute_fifo.capacity().min(integrate_fifo.capacity()),
                nodes.capacity()
            )));
        }

        let root = nodes.allocate(true).ok_or_else(|| {
            Error::InitializationFailed("no pool slot left for the root node".to_string())
        })?;
        nodes[root].initialize(
            NodeKind::Root,
            glam::Vec3::ZERO,
            config.root_radius,
            None,
            0,
        );

        engine_info!("galaxy3d::SphereTree",
            "Created sphere tree: {} spheres, pool capacity {}, leaf size {}, padding {}",
            config.max_spheres, capacity, config.max_leaf_size, config.padding);

        Ok(Self {
            config,
            nodes,
            recompute_fifo,
            integrate_fifo,
            root,
            visibility_sets: SlotMap::with_key(),
            visibility_order: Vec::new(),
            static_vis_tree,
        })
    }

    // ===== SPHERES =====

    /// Insert a leaf sphere for `user_data` and integrate it right away.
    ///
    /// Returns `Error::PoolExhausted` when every pool slot is taken.
    pub fn add_sphere(&mut self, bounds: BoundingSphere, user_data: UserData) -> Result<NodeHandle> {
        if !(bounds.radius >= 0.0) {
            engine_bail!("galaxy3d::SphereTree",
                "Cannot add sphere for {:?}: invalid radius {}", user_data, bounds.radius);
        }

        let node = self.allocate_node(NodeKind::Leaf, bounds, Some(user_data))?;
        self.nodes[node].flags.insert(NodeFlags::UPDATE_LEAVES | NodeFlags::NEEDS_INTEGRATE);

        let root = self.root;
        self.add_child(root, node);
        self.integrate(node, root, self.config.max_leaf_size);

        Ok(node)
    }

    /// Remove a leaf from the tree and return its slot to the pool.
    ///
    /// The root is never removed (warned and ignored). Super spheres left
    /// empty by the removal are pruned as well.
    pub fn remove_sphere(&mut self, node: NodeHandle) -> Result<()> {
        let Some(n) = self.nodes.get(node) else {
            engine_bail!("galaxy3d::SphereTree", "Cannot remove node {}: stale handle", node);
        };

        if n.is_root() {
            engine_warn!("galaxy3d::SphereTree", "Ignoring request to remove the root node");
            return Ok(());
        }
        if n.child_count > 0 {
            engine_bail!("galaxy3d::SphereTree",
                "Cannot remove node {}: it still has {} children", node, n.child_count);
        }

        self.remove_node(node);
        Ok(())
    }

    /// Move (and optionally resize) a leaf.
    ///
    /// Detaches the leaf for re-integration once its center reaches the
    /// binding distance of its parent. Pending work is done by `process()`.
    pub fn update_sphere(&mut self, node: NodeHandle, position: glam::Vec3, radius: Option<f32>) -> Result<()> {
        if let Some(radius) = radius {
            if !(radius >= 0.0) {
                engine_bail!("galaxy3d::SphereTree",
                    "Cannot update node {}: invalid radius {}", node, radius);
            }
        }

        let Some(n) = self.nodes.get_mut(node) else {
            engine_bail!("galaxy3d::SphereTree", "Cannot update node {}: stale handle", node);
        };
        if !n.is_leaf() {
            engine_bail!("galaxy3d::SphereTree",
                "Cannot update node {}: only leaf spheres can be moved", node);
        }

        let radius_changed = match radius {
            Some(radius) if radius != n.sphere.radius => {
                n.sphere.radius = radius;
                true
            }
            _ => false,
        };
        n.sphere.center = position;
        n.flags.insert(NodeFlags::UPDATE_LEAVES);

        let Some(parent) = n.parent else {
            return Ok(());
        };
        if n.flags.contains(NodeFlags::NEEDS_INTEGRATE) {
            return Ok(());
        }

        let parent_sphere = self.nodes[parent].sphere;
        if radius_changed {
            self.nodes[node].compute_binding_distance(parent_sphere.radius);
        }

        let distance_sq = position.distance_squared(parent_sphere.center);
        if distance_sq >= self.nodes[node].binding_distance_sq {
            // Pierced the parent: shrink it, re-home the leaf
            self.queue_recompute(parent);
            self.unlink(node);
            self.queue_integrate(node);
        } else if radius_changed {
            self.queue_recompute(parent);
        }

        Ok(())
    }

    /// Detach a leaf and queue it for re-integration under the root.
    pub fn add_integrate(&mut self, node: NodeHandle) -> Result<()> {
        let Some(n) = self.nodes.get(node) else {
            engine_bail!("galaxy3d::SphereTree", "Cannot integrate node {}: stale handle", node);
        };
        if !n.is_leaf() {
            engine_bail!("galaxy3d::SphereTree",
                "Cannot integrate node {}: only leaf spheres are integrated", node);
        }
        if n.flags.contains(NodeFlags::NEEDS_INTEGRATE) {
            return Ok(());
        }

        if let Some(parent) = n.parent {
            self.queue_recompute(parent);
            self.unlink(node);
        }
        self.queue_integrate(node);
        Ok(())
    }

    /// Queue a super sphere for recompute. A childless one is removed instead.
    pub fn add_recompute(&mut self, node: NodeHandle) -> Result<()> {
        if !self.nodes.contains(node) {
            engine_bail!("galaxy3d::SphereTree", "Cannot recompute node {}: stale handle", node);
        }
        self.queue_recompute(node);
        Ok(())
    }

    /// Drain both work queues.
    ///
    /// Recompute runs first. Each super sphere is recomputed at most once per
    /// call; a request reaching an already recomputed node is carried over to
    /// the next call. Only the entries pending when each phase starts are
    /// processed.
    pub fn process(&mut self) -> ProcessStats {
        let mut stats = ProcessStats::default();

        let mut recomputed: FxHashSet<NodeHandle> = FxHashSet::default();
        let mut deferred: Vec<NodeHandle> = Vec::new();

        let pending = self.recompute_fifo.entry_count();
        for _ in 0..pending {
            let Some(node) = self.recompute_fifo.pop() else {
                break;
            };
            if !self.nodes.contains(node) {
                continue;
            }
            self.nodes[node].recompute_slot = None;

            if !recomputed.insert(node) {
                deferred.push(node);
                continue;
            }

            stats.recomputed += 1;
            match self.recompute(node) {
                RecomputeOutcome::Empty => {
                    stats.removed += self.remove_node(node);
                }
                RecomputeOutcome::Unchanged => {}
                RecomputeOutcome::Changed => {
                    if let Some(parent) = self.nodes[node].parent {
                        if !self.nodes[parent].is_root() {
                            self.queue_recompute(parent);
                        }
                    }
                }
            }
        }

        // Only tombstones left, nobody holds a cell index into them
        if self.recompute_fifo.is_empty() {
            self.recompute_fifo.clear();
        }

        for node in deferred {
            if !self.nodes.contains(node) || !self.nodes[node].flags.contains(NodeFlags::NEEDS_RECOMPUTE) {
                continue;
            }
            match self.recompute_fifo.push(node) {
                Some(cell) => {
                    self.nodes[node].recompute_slot = Some(cell);
                    stats.deferred += 1;
                }
                None => {
                    engine_warn!("galaxy3d::SphereTree",
                        "Recompute queue full, dropping deferred recompute of node {}", node);
                    self.nodes[node].flags.remove(NodeFlags::NEEDS_RECOMPUTE);
                }
            }
        }

        let pending = self.integrate_fifo.entry_count();
        let root = self.root;
        for _ in 0..pending {
            let Some(node) = self.integrate_fifo.pop() else {
                break;
            };
            if !self.nodes.contains(node) {
                continue;
            }
            self.nodes[node].integrate_slot = None;
            self.integrate(node, root, self.config.max_leaf_size);
            stats.integrated += 1;
        }
        if self.integrate_fifo.is_empty() {
            self.integrate_fifo.clear();
        }

        if stats != ProcessStats::default() {
            engine_trace!("galaxy3d::SphereTree",
                "process: {} recomputed, {} removed, {} integrated, {} deferred",
                stats.recomputed, stats.removed, stats.integrated, stats.deferred);
        }

        stats
    }

    // ===== VISIBILITY SETS =====

    /// Register a visibility set. Every live node gets a coherence entry for it.
    pub fn add_visibility_set(&mut self, set: V) -> VisibilitySetKey {
        let key = self.visibility_sets.insert(set);
        self.visibility_order.push(key);

        let mut cursor = self.nodes.begin();
        while let Some(node) = cursor {
            self.nodes[node].vis_flags.push(VisFlags::empty());
            cursor = self.nodes.next();
        }

        engine_debug!("galaxy3d::SphereTree",
            "Registered visibility set #{} ({} live nodes)",
            self.visibility_order.len() - 1, self.nodes.used_count());
        key
    }

    /// Unregister a visibility set and hand it back.
    ///
    /// The set is returned as is: objects it holds are not removed from it.
    pub fn remove_visibility_set(&mut self, key: VisibilitySetKey) -> Option<V> {
        let index = self.visibility_order.iter().position(|&k| k == key)?;
        self.visibility_order.remove(index);

        let mut cursor = self.nodes.begin();
        while let Some(node) = cursor {
            let vis_flags = &mut self.nodes[node].vis_flags;
            if index < vis_flags.len() {
                vis_flags.remove(index);
            }
            cursor = self.nodes.next();
        }

        self.visibility_sets.remove(key)
    }

    // ===== ACCESSORS =====

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn node(&self, node: NodeHandle) -> Option<&SphereTreeNode> {
        self.nodes.get(node)
    }

    pub fn contains(&self, node: NodeHandle) -> bool {
        self.nodes.contains(node)
    }

    /// Iterate the direct children of `node` (empty for stale handles)
    pub fn children(&self, node: NodeHandle) -> Children<'_> {
        Children {
            nodes: &self.nodes,
            next: self.nodes.get(node).and_then(|n| n.first_child),
        }
    }

    pub fn visibility_set(&self, key: VisibilitySetKey) -> Option<&V> {
        self.visibility_sets.get(key)
    }

    pub fn visibility_set_mut(&mut self, key: VisibilitySetKey) -> Option<&mut V> {
        self.visibility_sets.get_mut(key)
    }

    pub fn visibility_set_count(&self) -> usize {
        self.visibility_order.len()
    }

    /// Index of a set inside each node's coherence flags
    pub fn visibility_set_index(&self, key: VisibilitySetKey) -> Option<usize> {
        self.visibility_order.iter().position(|&k| k == key)
    }

    /// Live nodes, root and super spheres included
    pub fn node_count(&self) -> usize {
        self.nodes.used_count()
    }

    /// Node pool capacity
    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub fn pending_recompute(&self) -> usize {
        self.recompute_fifo.entry_count()
    }

    pub fn pending_integrate(&self) -> usize {
        self.integrate_fifo.entry_count()
    }

    pub fn config(&self) -> &SphereTreeConfig {
        &self.config
    }

    pub fn static_vis_tree(&self) -> Option<&dyn StaticVisTree> {
        self.static_vis_tree.as_deref()
    }

    /// Swap the static visibility structure. Cached leaf lists are refreshed
    /// on the next visibility query.
    pub fn set_static_vis_tree(&mut self, static_vis_tree: Option<Box<dyn StaticVisTree>>) {
        self.static_vis_tree = static_vis_tree;

        let mut cursor = self.nodes.begin();
        while let Some(node) = cursor {
            let n = &mut self.nodes[node];
            if n.is_leaf() {
                n.flags.insert(NodeFlags::UPDATE_LEAVES);
                n.static_leaves.clear();
            }
            cursor = self.nodes.next();
        }
    }

    // ===== HIERARCHY =====

    /// Splice `child` at the head of `parent`'s child list.
    pub(crate) fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) {
        let first_child = self.nodes[parent].first_child;

        let c = &mut self.nodes[child];
        c.parent = Some(parent);
        c.next_sibling = first_child;
        c.previous_sibling = None;

        if let Some(first) = first_child {
            self.nodes[first].previous_sibling = Some(child);
        }

        let p = &mut self.nodes[parent];
        p.first_child = Some(child);
        p.child_count += 1;
    }

    /// Unsplice `child` from `parent`'s child list.
    ///
    /// A super sphere losing its last child is removed on the spot.
    /// Returns the number of nodes released that way.
    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> usize {
        debug_assert!(self.nodes[parent].child_count > 0, "node {} has no children", parent);
        debug_assert!(
            self.children(parent).any(|c| c == child),
            "node {} is not a child of {}", child, parent
        );

        let c = &mut self.nodes[child];
        let previous = c.previous_sibling.take();
        let next = c.next_sibling.take();

        match previous {
            Some(previous) => self.nodes[previous].next_sibling = next,
            None => self.nodes[parent].first_child = next,
        }
        if let Some(next) = next {
            self.nodes[next].previous_sibling = previous;
        }

        let p = &mut self.nodes[parent];
        p.child_count = p.child_count.saturating_sub(1);

        if p.child_count == 0 && p.is_super_sphere() {
            self.remove_node(parent)
        } else {
            0
        }
    }

    /// Detach a childless node from its parent and cancel its queued work.
    ///
    /// Returns the number of emptied ancestors released on the way.
    pub(crate) fn unlink(&mut self, node: NodeHandle) -> usize {
        debug_assert!(
            self.nodes[node].child_count == 0,
            "cannot unlink node {} while it has children", node
        );

        let n = &mut self.nodes[node];
        let recompute_slot = n.recompute_slot.take();
        let integrate_slot = n.integrate_slot.take();
        let parent = n.parent.take();
        n.flags.remove(NodeFlags::NEEDS_RECOMPUTE | NodeFlags::NEEDS_INTEGRATE);

        if let Some(cell) = recompute_slot {
            self.recompute_fifo.cancel(cell, node);
        }
        if let Some(cell) = integrate_slot {
            self.integrate_fifo.cancel(cell, node);
        }

        match parent {
            Some(parent) => self.remove_child(parent, node),
            None => 0,
        }
    }

    /// Release a node and any super sphere emptied by its removal.
    ///
    /// Returns the number of nodes released (0 for the root).
    pub(crate) fn remove_node(&mut self, node: NodeHandle) -> usize {
        if self.nodes[node].is_root() {
            return 0;
        }

        self.unregister_from_sets(node);
        let pruned = self.unlink(node);

        let n = &mut self.nodes[node];
        n.vis_flags.clear();
        n.static_leaves.clear();
        n.user_data = None;
        self.nodes.release(node);

        1 + pruned
    }

    /// Refit a super sphere around its children (shrink only).
    pub(crate) fn recompute(&mut self, node: NodeHandle) -> RecomputeOutcome {
        let n = &mut self.nodes[node];
        n.flags.remove(NodeFlags::NEEDS_RECOMPUTE);
        if let Some(cell) = n.recompute_slot.take() {
            self.recompute_fifo.cancel(cell, node);
        }

        let n = &self.nodes[node];
        if n.child_count == 0 {
            return RecomputeOutcome::Empty;
        }
        if n.is_root() {
            return RecomputeOutcome::Unchanged;
        }
        let current_radius = n.sphere.radius;
        let padding = self.config.padding;

        let mut sum = glam::Vec3::ZERO;
        let mut count = 0u32;
        for child in self.children(node) {
            sum += self.nodes[child].sphere.center;
            count += 1;
        }
        let center = sum / count as f32;

        let mut max_radius = 0.0f32;
        for child in self.children(node) {
            let child_sphere = &self.nodes[child].sphere;
            let enclosing = center.distance(child_sphere.center) + child_sphere.radius;
            if enclosing > max_radius {
                max_radius = enclosing;
                if max_radius + padding >= current_radius {
                    return RecomputeOutcome::Unchanged;
                }
            }
        }

        self.nodes[node].sphere = BoundingSphere::new(center, max_radius + padding);
        self.refresh_binding_distances(node);
        RecomputeOutcome::Changed
    }

    fn refresh_binding_distances(&mut self, node: NodeHandle) {
        let radius = self.nodes[node].sphere.radius;
        let mut child = self.nodes[node].first_child;
        while let Some(c) = child {
            let n = &mut self.nodes[c];
            n.compute_binding_distance(radius);
            child = n.next_sibling;
        }
    }

    /// Place `node` under the best fitting child of `super_sphere`.
    ///
    /// Candidates are the non-empty super spheres below `super_sphere`.
    /// The closest one that already encloses the node wins. Otherwise the
    /// one needing the least growth is grown, provided it stays within
    /// `node_size`. Otherwise a new super sphere is created around the node.
    pub(crate) fn integrate(&mut self, node: NodeHandle, super_sphere: NodeHandle, node_size: f32) {
        let sphere = self.nodes[node].sphere;
        let padding = self.config.padding;

        // (candidate, squared center distance)
        let mut enclosing: Option<(NodeHandle, f32)> = None;
        // (candidate, growth needed)
        let mut growing: Option<(NodeHandle, f32)> = None;

        for candidate in self.children(super_sphere) {
            let c = &self.nodes[candidate];
            if !c.is_super_sphere() || c.child_count == 0 {
                continue;
            }

            let distance_sq = sphere.center.distance_squared(c.sphere.center);
            match enclosing {
                Some((_, best_sq)) => {
                    if distance_sq < best_sq
                        && distance_sq.sqrt() + sphere.radius <= c.sphere.radius
                    {
                        enclosing = Some((candidate, distance_sq));
                    }
                }
                None => {
                    let growth = distance_sq.sqrt() + sphere.radius - c.sphere.radius;
                    if growth < growing.map_or(f32::MAX, |(_, g)| g) {
                        if growth < 0.0 {
                            enclosing = Some((candidate, distance_sq));
                        } else {
                            growing = Some((candidate, growth));
                        }
                    }
                }
            }
        }

        let grown = growing.and_then(|(candidate, growth)| {
            let new_radius = growth + self.nodes[candidate].sphere.radius + padding;
            (new_radius <= node_size).then_some((candidate, new_radius))
        });

        if let Some((target, _)) = enclosing {
            self.unlink(node);
            self.add_child(target, node);
            let radius = self.nodes[target].sphere.radius;
            self.nodes[node].compute_binding_distance(radius);
            self.recompute(target);
        } else if let Some((target, new_radius)) = grown {
            self.unlink(node);
            self.nodes[target].sphere.radius = new_radius;
            self.add_child(target, node);
            self.recompute(target);
            self.refresh_binding_distances(target);
        } else {
            self.unlink(node);
            let bounds = BoundingSphere::new(sphere.center, sphere.radius + padding);
            match self.allocate_node(NodeKind::SuperSphere, bounds, None) {
                Ok(parent) => {
                    self.add_child(parent, node);
                    self.add_child(super_sphere, parent);
                    self.recompute(parent);
                    let radius = self.nodes[parent].sphere.radius;
                    self.nodes[node].compute_binding_distance(radius);
                }
                Err(_) => {
                    // Retried on the next update: a zero binding distance
                    // detaches it again at once
                    engine_warn!("galaxy3d::SphereTree",
                        "No super sphere available for node {}, leaving it under {}", node, super_sphere);
                    self.add_child(super_sphere, node);
                    self.nodes[node].binding_distance_sq = 0.0;
                }
            }
        }

        self.nodes[node].flags.remove(NodeFlags::NEEDS_INTEGRATE);
    }

    // ===== QUEUES =====

    /// Attach under the root and queue for integration (idempotent).
    fn queue_integrate(&mut self, node: NodeHandle) {
        if self.nodes[node].flags.contains(NodeFlags::NEEDS_INTEGRATE) {
            return;
        }

        let root = self.root;
        self.add_child(root, node);
        self.nodes[node].flags.insert(NodeFlags::NEEDS_INTEGRATE);

        match self.integrate_fifo.push(node) {
            Some(cell) => self.nodes[node].integrate_slot = Some(cell),
            None => {
                engine_warn!("galaxy3d::SphereTree",
                    "Integrate queue full ({} cells), integrating node {} immediately",
                    self.integrate_fifo.capacity(), node);
                self.integrate(node, root, self.config.max_leaf_size);
            }
        }
    }

    /// Queue a super sphere for recompute (idempotent, never the root).
    fn queue_recompute(&mut self, node: NodeHandle) {
        let n = &self.nodes[node];
        if n.is_root() || n.flags.contains(NodeFlags::NEEDS_RECOMPUTE) {
            return;
        }
        if n.child_count == 0 {
            if n.is_super_sphere() {
                self.remove_node(node);
            }
            return;
        }

        self.nodes[node].flags.insert(NodeFlags::NEEDS_RECOMPUTE);
        match self.recompute_fifo.push(node) {
            Some(cell) => self.nodes[node].recompute_slot = Some(cell),
            None => {
                engine_warn!("galaxy3d::SphereTree",
                    "Recompute queue full ({} cells), recomputing node {} immediately",
                    self.recompute_fifo.capacity(), node);
                if self.recompute(node) == RecomputeOutcome::Empty {
                    self.remove_node(node);
                }
            }
        }
    }

    // ===== INTERNALS =====

    fn allocate_node(
        &mut self,
        kind: NodeKind,
        bounds: BoundingSphere,
        user_data: Option<UserData>,
    ) -> Result<NodeHandle> {
        let Some(node) = self.nodes.allocate(true) else {
            let capacity = self.nodes.capacity();
            engine_error!("galaxy3d::SphereTree",
                "Node pool exhausted (capacity {}), cannot allocate {:?} node", capacity, kind);
            return Err(Error::PoolExhausted { capacity });
        };

        let set_count = self.visibility_order.len();
        self.nodes[node].initialize(kind, bounds.center, bounds.radius, user_data, set_count);
        Ok(node)
    }

    /// Remove a leaf's object from every set it is currently visible in.
    pub(crate) fn unregister_from_sets(&mut self, node: NodeHandle) {
        let n = &self.nodes[node];
        if !n.is_leaf() {
            return;
        }
        let Some(user_data) = n.user_data else {
            return;
        };

        for (index, key) in self.visibility_order.iter().enumerate() {
            if n.vis_flags(index).intersects(VisFlags::PARTIAL | VisFlags::INSIDE) {
                if let Some(set) = self.visibility_sets.get_mut(*key) {
                    set.remove(user_data);
                }
            }
        }
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    nodes: &'a Pool<SphereTreeNode>,
    next: Option<NodeHandle>,
}

impl Iterator for Children<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let current = self.next?;
        self.next = self.nodes.get(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

#[cfg(test)]
#[path = "sphere_tree_tests.rs"]
mod tests;
