/// Frustum: six clipping planes for visibility culling.
///
/// Each plane is represented as a Vec4 (A, B, C, D) where:
/// - (A, B, C) is the inward-pointing normal
/// - D is the signed distance
/// - A point P is inside the frustum if dot(plane, P_homogeneous) >= 0 for all planes
///
/// The frustum also remembers the point it was cast from (`origin`), which
/// the sphere tree uses to locate the query in the static visibility tree.

use glam::{Mat4, Vec3, Vec4};
use super::bounding_sphere::BoundingSphere;

/// Result of a 3-way frustum/sphere classification.
///
/// Drives hierarchical culling in the sphere tree:
/// - `Outside` → the whole subtree is hidden
/// - `Inside` → the whole subtree is visible, no further plane tests
/// - `Partial` → classify each child on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrustumTest {
    /// Sphere is entirely outside the frustum
    Outside,
    /// Sphere is entirely inside the frustum
    Inside,
    /// Sphere straddles at least one plane
    Partial,
}

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Frustum planes: left, right, bottom, top, near, far
    pub planes: [Vec4; 6],
    /// World-space point the frustum is cast from (camera eye, light position)
    origin: Vec3,
}

impl Frustum {
    /// Build a frustum from already-normalized inward planes.
    pub fn from_planes(planes: [Vec4; 6], origin: Vec3) -> Self {
        Self { planes, origin }
    }

    /// Extract frustum planes from a view-projection matrix.
    ///
    /// Uses the Gribb & Hartmann method. Works for both perspective
    /// and orthographic projections. The origin defaults to `Vec3::ZERO`;
    /// call [`Frustum::with_origin`] with the eye position.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();
        let row = |r: usize| Vec4::new(m[0][r], m[1][r], m[2][r], m[3][r]);
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        let mut planes = [w + x, w - x, w + y, w - y, w + z, w - z];

        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes, origin: Vec3::ZERO }
    }

    /// Set the point this frustum is cast from.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Classify a sphere against the frustum (3-way test).
    ///
    /// - Sphere entirely behind any plane → `Outside` (early out)
    /// - Sphere crossing any plane → `Partial`
    /// - Otherwise → `Inside`
    pub fn classify_sphere(&self, sphere: &BoundingSphere) -> FrustumTest {
        let mut result = FrustumTest::Inside;

        for plane in &self.planes {
            let distance = plane.truncate().dot(sphere.center) + plane.w;

            if distance < -sphere.radius {
                return FrustumTest::Outside;
            }

            if distance < sphere.radius {
                result = FrustumTest::Partial;
            }
        }

        result
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
