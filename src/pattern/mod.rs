//! Wildcard subscription patterns over configuration keys.
//!
//! A pattern has one matcher per key segment. Group and resource segments
//! accept an exact string, `*`, `*text*` (contains), `text*` (prefix) or
//! `*text` (suffix); the namespace segment is always exact.

mod matcher;

pub use matcher::*;
