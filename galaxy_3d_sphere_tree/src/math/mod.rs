//! Math primitives consumed by the sphere tree.
//!
//! Passive value types only: the tree reads spheres and classifies them
//! against frustums, it never owns a camera.

mod bounding_sphere;
mod frustum;

pub use bounding_sphere::BoundingSphere;
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
