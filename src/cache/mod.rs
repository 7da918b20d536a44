//! Snapshot cache collaborator.
//!
//! The query and poll paths only consume the [`ConfigStore`] read interface;
//! [`MemoryConfigStore`] is the in-process implementation that also owns the
//! write side (publish, gray variants, history).

mod history;
mod key_lock;
mod snapshot;
mod store;
mod trace;

pub use history::ConfigHistoryInfo;
pub use history::Page;
pub use key_lock::*;
pub use snapshot::*;
pub use store::*;
pub use trace::*;

#[cfg(test)]
mod store_test;

/// Content fingerprint: lowercase hex MD5.
pub fn fingerprint(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}
