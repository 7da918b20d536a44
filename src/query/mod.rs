//! Config query resolution.
//!
//! A read request runs through an ordered chain of [`QueryResolver`]s; the
//! first one that claims the request produces the [`QueryOutcome`].
//!
//! ```text
//! request ─▶ read guard (bounded retry) ──busy──▶ CONFLICT
//!                 │
//!                 ▼
//!        ┌─────────────────┐  claims  ┌──────────────────────────┐
//!        │ gray rule match │ ───────▶ │ RESOLVED(BETA|TAG)       │
//!        └────────┬────────┘          └──────────────────────────┘
//!                 ▼
//!        ┌─────────────────┐  claims  ┌──────────────────────────┐
//!        │ default config  │ ───────▶ │ RESOLVED(NONE|TAG_NOT_FOUND)
//!        └────────┬────────┘          └──────────────────────────┘
//!                 ▼
//!             NOT_FOUND
//! ```

mod chain;
mod default_config;
mod gray_match;
mod outcome;

pub use chain::*;
pub use default_config::*;
pub use gray_match::*;
pub use outcome::*;


use crate::gray::select_variant;
use crate::ConfigSnapshot;
use crate::ConfigStore;
use crate::ClientLabels;

/// Per-request state threaded through the chain.
///
/// Built once by the chain entry while the key's read guard is held.
pub struct QueryContext<'a> {
    pub request: &'a QueryRequest,
    /// `None` when the key has no snapshot
    pub snapshot: Option<&'a ConfigSnapshot>,
    pub store: &'a dyn ConfigStore,
}

/// One link of the resolution chain.
pub trait QueryResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> bool;

    fn handle(
        &self,
        ctx: &QueryContext<'_>,
    ) -> QueryOutcome;
}

/// Fingerprint a client carrying `labels` should currently hold for this
/// snapshot: the selected gray variant's, or the default one.
pub fn effective_fingerprint<'a>(
    snapshot: &'a ConfigSnapshot,
    labels: &ClientLabels,
) -> &'a str {
    select_variant(&snapshot.variants, labels)
        .map(|v| v.fingerprint.as_str())
        .unwrap_or(snapshot.fingerprint.as_str())
}
