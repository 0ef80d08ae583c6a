/// Frame-coherent frustum culling over the sphere tree.
///
/// The traversal classifies spheres against the frustum top-down:
/// - `Outside` → the subtree is still walked so visible leaves get removed
///   from the set, but no plane tests are done
/// - `Inside` → the subtree is fully visible, no further plane tests
/// - `Partial` → each child classifies itself
///
/// Each node remembers, per visibility set, the state it had on the last
/// query (`VisFlags`). Leaves only notify the set when their state changes.

use crate::error::{Error, Result};
use crate::math::{Frustum, FrustumTest};
use crate::utils::Pool;
use crate::{engine_bail, engine_error};
use super::node::{NodeFlags, NodeHandle, SphereTreeNode, VisFlags};
use super::sphere_tree::SphereTree;
use super::visibility::{pvs_bit, SearchFlags, StaticVisTree, VisibilitySet, VisibilitySetKey};

impl<V: VisibilitySet> SphereTree<V> {
    /// Update the visibility set `set_key` for `frustum`.
    ///
    /// When a static visibility tree is attached (and
    /// `SearchFlags::SKIP_STATIC_VISIBILITY` is not given), leaves whose
    /// static leaves are all hidden from the frustum origin count as outside.
    pub fn compute_visibility(
        &mut self,
        frustum: &Frustum,
        set_key: VisibilitySetKey,
        search_flags: SearchFlags,
    ) -> Result<()> {
        let set_index = self.visibility_order.iter().position(|&k| k == set_key);
        let (Some(set_index), Some(set)) = (set_index, self.visibility_sets.get_mut(set_key)) else {
            engine_error!("galaxy3d::SphereTree",
                "compute_visibility: visibility set is not registered with this tree");
            return Err(Error::UnknownVisibilitySet);
        };

        let static_vis = if search_flags.contains(SearchFlags::SKIP_STATIC_VISIBILITY) {
            None
        } else {
            self.static_vis_tree.as_deref()
        };
        let pvs = static_vis.and_then(|tree| {
            let source_leaf = tree.find_leaf(frustum.origin())?;
            tree.pvs_row(source_leaf).map(|row| (tree, row))
        });

        let mut query = VisibilityQuery {
            nodes: &mut self.nodes,
            frustum,
            set,
            set_index,
            pvs,
        };
        query.visit(self.root, FrustumTest::Partial);

        Ok(())
    }

    /// Forget the cached visibility of `node` and its ancestors.
    ///
    /// A leaf currently visible in any set is removed from it, so the next
    /// query reports it again if it is still visible.
    pub fn invalidate_visibility(&mut self, node: NodeHandle) -> Result<()> {
        if !self.nodes.contains(node) {
            engine_bail!("galaxy3d::SphereTree",
                "Cannot invalidate visibility of node {}: stale handle", node);
        }

        let mut current = Some(node);
        while let Some(handle) = current {
            self.unregister_from_sets(handle);
            let n = &mut self.nodes[handle];
            n.vis_flags.iter_mut().for_each(|flags| *flags = VisFlags::empty());
            current = n.parent;
        }
        Ok(())
    }
}

struct VisibilityQuery<'a, V> {
    nodes: &'a mut Pool<SphereTreeNode>,
    frustum: &'a Frustum,
    set: &'a mut V,
    set_index: usize,
    /// Static tree and the PVS row of the leaf the frustum is cast from
    pvs: Option<(&'a dyn StaticVisTree, &'a [u8])>,
}

impl<V: VisibilitySet> VisibilityQuery<'_, V> {
    fn visit(&mut self, node: NodeHandle, inherited: FrustumTest) {
        let n = &mut self.nodes[node];

        let mut state = inherited;
        if state == FrustumTest::Partial {
            state = self.frustum.classify_sphere(&n.sphere);
        }

        // Occlusion by static geometry
        if state != FrustumTest::Outside && n.is_leaf() {
            if let Some((static_vis, source_row)) = self.pvs {
                if n.flags.contains(NodeFlags::UPDATE_LEAVES) {
                    n.flags.remove(NodeFlags::UPDATE_LEAVES);
                    static_vis.find_leaves(&n.sphere, &mut n.static_leaves);
                }

                if !n.static_leaves.is_empty()
                    && !n.static_leaves.iter().any(|&leaf| pvs_bit(source_row, leaf))
                {
                    state = FrustumTest::Outside;
                }
            }
        }

        let target = match state {
            FrustumTest::Outside => VisFlags::HIDDEN,
            FrustumTest::Inside => VisFlags::INSIDE,
            FrustumTest::Partial => VisFlags::PARTIAL,
        };
        let previous = std::mem::replace(&mut n.vis_flags[self.set_index], target);

        if n.is_leaf() {
            if previous == target {
                return;
            }
            let Some(user_data) = n.user_data else {
                return;
            };

            match state {
                FrustumTest::Outside => {
                    if previous.intersects(VisFlags::INSIDE | VisFlags::PARTIAL) {
                        self.set.remove(user_data);
                    }
                }
                FrustumTest::Inside | FrustumTest::Partial => self.set.insert(user_data, state),
            }
            return;
        }

        let mut child = n.first_child;
        while let Some(c) = child {
            child = self.nodes[c].next_sibling;
            self.visit(c, state);
        }
    }
}

#[cfg(test)]
#[path = "culling_tests.rs"]
mod tests;
