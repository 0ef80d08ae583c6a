/// Sphere tree configuration.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereTreeConfig {
    /// Maximum number of leaf spheres the tree is expected to hold.
    /// The node pool is sized to twice this to make room for super spheres.
    pub max_spheres: usize,
    /// Largest radius a super sphere may grow to when absorbing a leaf
    pub max_leaf_size: f32,
    /// Slack added around super spheres so small moves don't detach leaves
    pub padding: f32,
    /// Radius of the root sphere, centered at the origin
    pub root_radius: f32,
}

impl Default for SphereTreeConfig {
    fn default() -> Self {
        Self {
            max_spheres: 1024,
            max_leaf_size: 32.0,
            padding: 0.1,
            root_radius: 65536.0,
        }
    }
}

impl SphereTreeConfig {
    pub fn new(max_spheres: usize, max_leaf_size: f32, padding: f32) -> Self {
        Self {
            max_spheres,
            max_leaf_size,
            padding,
            ..Default::default()
        }
    }

    pub fn with_root_radius(mut self, root_radius: f32) -> Self {
        self.root_radius = root_radius;
        self
    }

    /// Node pool capacity: leaves plus the super spheres synthesized around them
    pub fn pool_capacity(&self) -> usize {
        self.max_spheres.saturating_mul(2)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_spheres == 0 {
            return Err(Error::InitializationFailed("max_spheres must be at least 1".to_string()));
        }
        if self.max_spheres > (u32::MAX / 2) as usize {
            return Err(Error::InitializationFailed(format!(
                "max_spheres {} exceeds the addressable node count", self.max_spheres
            )));
        }
        if !(self.max_leaf_size > 0.0) {
            return Err(Error::InitializationFailed(format!(
                "max_leaf_size must be positive (got {})", self.max_leaf_size
            )));
        }
        if !(self.padding >= 0.0) {
            return Err(Error::InitializationFailed(format!(
                "padding must not be negative (got {})", self.padding
            )));
        }
        if !(self.root_radius > 0.0) {
            return Err(Error::InitializationFailed(format!(
                "root_radius must be positive (got {})", self.root_radius
            )));
        }
        Ok(())
    }
}
