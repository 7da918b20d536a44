//! In-process core of a configuration distribution service.
//!
//! - [`QueryResolutionChain`] answers config reads, applying gray rules.
//! - [`LongPollCoordinator`] parks clients until a watched key changes.
//! - [`FuzzyWatchRegistry`] tracks wildcard subscriptions and emits
//!   matched-set deltas as keys appear and disappear.
//! - [`ConfigHub`] wires them over a [`MemoryConfigStore`] so every publish
//!   reaches both notification paths.

mod cache;
mod config;
mod errors;
mod fuzzy;
mod gray;
mod hub;
mod model;
mod pattern;
mod poll;
mod query;

pub mod constants;
pub mod metrics;
pub mod utils;

pub use cache::*;
pub use self::config::*;
pub use errors::*;
pub use fuzzy::*;
pub use gray::*;
pub use hub::*;
pub use model::*;
pub use pattern::*;
pub use poll::*;
pub use query::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
