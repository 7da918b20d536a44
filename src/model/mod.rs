//! Identity types shared by every component: config keys and client labels.

mod key;

pub use key::*;

#[cfg(test)]
mod key_test;
