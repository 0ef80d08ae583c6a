/// Bounding sphere: center and radius in world space.
///
/// Every node of the sphere tree carries one. Leaf spheres come from the
/// objects they represent, super spheres are derived from their children.

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// World-space center
    pub center: Vec3,
    /// Radius (never negative)
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        debug_assert!(radius >= 0.0, "negative sphere radius: {}", radius);
        Self { center, radius }
    }

    /// Test if a point lies inside or on the sphere surface.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    /// Test if `other` lies entirely within this sphere.
    ///
    /// Touching from the inside counts as contained.
    pub fn contains_sphere(&self, other: &BoundingSphere) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }

    /// Test if the two spheres overlap or touch.
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) <= reach * reach
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self { center: Vec3::ZERO, radius: 0.0 }
    }
}

#[cfg(test)]
#[path = "bounding_sphere_tests.rs"]
mod tests;
