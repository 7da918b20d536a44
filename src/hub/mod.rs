//! Process-level facade wiring the store, the query chain and both
//! notification paths together.

mod builder;
mod config_hub;

pub use builder::*;
pub use config_hub::*;
