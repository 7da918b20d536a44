//! Long polling: parked requests woken by fingerprint changes.
//!
//! ```text
//! poll(watch set) ─▶ any stale? ──yes──▶ respond(stale keys)
//!                        │ no
//!                        ▼
//!            register hold under every key ─▶ re-check ─▶ wait
//!                                                         │
//!        notify_changed(key) ── re-check whole set ──────▶│──▶ respond(stale keys)
//!        deadline / shutdown ────────────────────────────▶│──▶ respond([])
//! ```
//!
//! Each hold completes exactly once; the losing path is a no-op.

mod coordinator;
mod hold;

pub use coordinator::*;
pub use hold::*;
