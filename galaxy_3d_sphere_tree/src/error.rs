//! Error types for the Galaxy3D sphere tree
//!
//! This module defines the error types returned by the node pool, the
//! sphere tree and its visibility set registry.

use std::fmt;

/// Result type for Galaxy3D sphere tree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Galaxy3D sphere tree errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The node pool has no free slot left (the pool never grows)
    PoolExhausted {
        /// Total number of slots the pool was created with
        capacity: usize,
    },

    /// A node handle is stale, foreign, or refers to a node that cannot be used here
    InvalidNode(String),

    /// The visibility set key is not registered with the tree
    UnknownVisibilitySet,

    /// Tree construction failed (invalid configuration)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PoolExhausted { capacity } => {
                write!(f, "Node pool exhausted (capacity {})", capacity)
            }
            Error::InvalidNode(msg) => write!(f, "Invalid node: {}", msg),
            Error::UnknownVisibilitySet => write!(f, "Unknown visibility set"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
