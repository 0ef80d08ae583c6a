//! Dynamic sphere tree
//!
//! Bounding-sphere hierarchy for tracking moving objects and answering
//! frame-coherent frustum visibility queries.

mod config;
mod node;
mod visibility;
mod sphere_tree;
mod culling;

pub use config::SphereTreeConfig;
pub use node::{NodeFlags, NodeHandle, NodeKind, SphereTreeNode, VisFlags};
pub use visibility::{
    pvs_bit, ObjectVisibilitySet, SearchFlags, StaticVisTree, UserData,
    VisibilitySet, VisibilitySetKey,
};
pub use sphere_tree::{Children, ProcessStats, RecomputeOutcome, SphereTree};
