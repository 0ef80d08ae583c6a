//! Fixed-capacity containers backing the sphere tree
//!
//! Both structures allocate all their storage up front and never grow.

mod pool;
mod fifo;

pub use pool::{Pool, PoolHandle};
pub use fifo::Fifo;
