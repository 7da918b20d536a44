//! Gray release rules and variant selection.
//!
//! A key may carry several [`GrayVariant`]s, each guarded by a [`GrayRule`]
//! evaluated against the requesting client's [`ClientLabels`](crate::ClientLabels).

mod engine;
mod rule;

pub use engine::*;
pub use rule::*;

#[cfg(test)]
mod gray_test;
