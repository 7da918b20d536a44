use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::metrics;
use crate::ClientLabels;
use crate::ConfigKey;

/// How a poll request asked to be held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldIntent {
    /// Explicit long-poll opt-in carrying the client's own timeout
    LongPoll(Duration),
    /// Old clients only send a hold marker; they get the legacy hold timeout
    LegacyMarker,
    /// Compare fingerprints and answer right away
    ShortPoll,
}

/// A client's watch set: every key it follows with the fingerprint it holds.
///
/// An empty fingerprint stands for "I have no content for this key".
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub watched: HashMap<ConfigKey, String>,
    pub labels: ClientLabels,
    pub intent: HoldIntent,
    /// Answer immediately even when nothing changed
    pub no_hang_up: bool,
}

impl PollRequest {
    pub fn new(
        watched: HashMap<ConfigKey, String>,
        labels: ClientLabels,
        intent: HoldIntent,
    ) -> Self {
        Self {
            watched,
            labels,
            intent,
            no_hang_up: false,
        }
    }

    pub fn with_no_hang_up(
        mut self,
        no_hang_up: bool,
    ) -> Self {
        self.no_hang_up = no_hang_up;
        self
    }
}

/// Why a poll finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResolution {
    /// Stale keys were found before suspending
    Immediate,
    /// A change notification woke the hold
    Changed,
    Timeout,
    /// Nothing changed and the request did not ask to be held
    NotHeld,
    Shutdown,
}

impl PollResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollResolution::Immediate => "immediate",
            PollResolution::Changed => "changed",
            PollResolution::Timeout => "timeout",
            PollResolution::NotHeld => "not_held",
            PollResolution::Shutdown => "shutdown",
        }
    }
}

/// Result handed back to the poller. `changed_keys` is empty unless
/// something the client watches is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollResponse {
    pub changed_keys: Vec<ConfigKey>,
    pub resolution: PollResolution,
}

impl PollResponse {
    pub(crate) fn new(
        mut changed_keys: Vec<ConfigKey>,
        resolution: PollResolution,
    ) -> Self {
        changed_keys.sort();
        metrics::POLL_RESOLUTION_COUNTER
            .with_label_values(&[resolution.as_str()])
            .inc();
        Self {
            changed_keys,
            resolution,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed_keys.is_empty()
    }
}

/// A parked poll. Registered under every watched key; completed exactly once.
#[derive(Debug)]
pub(crate) struct PollHold {
    pub(crate) id: u64,
    pub(crate) watched: HashMap<ConfigKey, String>,
    pub(crate) labels: ClientLabels,
    pub(crate) arrived_at: Instant,
    pub(crate) deadline: Instant,
    completed: AtomicBool,
    sink: Mutex<Option<oneshot::Sender<PollResponse>>>,
}

impl PollHold {
    pub(crate) fn new(
        id: u64,
        request: PollRequest,
        timeout: Duration,
        sink: oneshot::Sender<PollResponse>,
    ) -> Self {
        let arrived_at = Instant::now();
        Self {
            id,
            watched: request.watched,
            labels: request.labels,
            arrived_at,
            deadline: arrived_at + timeout,
            completed: AtomicBool::new(false),
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Delivers `changed_keys` unless another path already completed the
    /// hold. Returns whether this call won.
    pub(crate) fn try_complete(
        &self,
        changed_keys: Vec<ConfigKey>,
        resolution: PollResolution,
    ) -> bool {
        if self.completed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(sink) = self.sink.lock().take() {
            // receiver gone means the poller was cancelled; nothing to deliver
            let _ = sink.send(PollResponse::new(changed_keys, resolution));
        }
        true
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}
