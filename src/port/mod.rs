//! Host port selection for new servers.

pub mod allocator;

pub use allocator::{allocate, PortRange};
