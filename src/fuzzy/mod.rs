//! Wildcard (fuzzy) watches over the key space.

mod registry;

pub use registry::*;
