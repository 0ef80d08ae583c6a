/*!
# Galaxy 3D Sphere Tree

Dynamic bounding-sphere hierarchy for the Galaxy 3D engine.

The tree tracks moving objects in a fixed-capacity pool of spheres and
answers frame-coherent visibility queries: each registered visibility set
is only told about objects whose visibility changed since the last query.

## Architecture

- **SphereTree**: Root/super-sphere/leaf hierarchy with deferred
  recompute and integrate work queues, drained by `process()`
- **VisibilitySet**: Receiver of visibility transitions (one per camera, light...)
- **StaticVisTree**: Optional precomputed PVS used to reject occluded leaves
- **Pool / Fifo**: Fixed-capacity containers backing the tree
*/

// Internal modules
mod error;
pub mod log;
pub mod math;
pub mod utils;
pub mod sphere_tree;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Sphere tree entry point
    pub use crate::sphere_tree::SphereTree;

    // Logging sub-module (types and logger control, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        pub use crate::log::{set_logger, reset_logger, log};
    }

    // Math sub-module
    pub mod math {
        pub use crate::math::*;
    }

    // Sphere tree sub-module
    pub mod sphere_tree {
        pub use crate::sphere_tree::*;
    }

    // Containers sub-module
    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
