use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::HoldIntent;
use super::PollHold;
use super::PollRequest;
use super::PollResolution;
use super::PollResponse;
use crate::metrics;
use crate::query::effective_fingerprint;
use crate::ClientLabels;
use crate::ConfigKey;
use crate::ConfigStore;
use crate::LongPollConfig;
use crate::PollError;
use crate::Result;

/// Parks poll requests until a watched key changes or the hold times out.
///
/// Holds are indexed by every key they watch. A publish calls
/// [`LongPollCoordinator::notify_changed`] after the write is visible; each
/// hold under that key re-checks its whole watch set and is woken only if
/// something it follows is stale.
pub struct LongPollCoordinator {
    holds: DashMap<ConfigKey, HashMap<u64, Arc<PollHold>>>,
    next_id: AtomicU64,
    store: Arc<dyn ConfigStore>,
    config: LongPollConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for LongPollCoordinator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LongPollCoordinator")
            .field("watched_keys", &self.holds.len())
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Removes a hold from every key it was registered under when dropped,
/// including when the polling future is dropped mid-wait.
struct HoldRegistration<'a> {
    coordinator: &'a LongPollCoordinator,
    hold: Arc<PollHold>,
}

impl Drop for HoldRegistration<'_> {
    fn drop(&mut self) {
        self.coordinator.unregister(&self.hold);
        metrics::HELD_POLLS_GAUGE.dec();
        trace!(
            hold_id = self.hold.id,
            held_ms = self.hold.arrived_at.elapsed().as_millis() as u64,
            completed = self.hold.is_completed(),
            "Poll hold released"
        );
    }
}

impl LongPollCoordinator {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        config: LongPollConfig,
    ) -> Self {
        Self {
            holds: DashMap::new(),
            next_id: AtomicU64::new(1),
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Answers a poll request.
    ///
    /// Returns at once with the stale keys if any watched fingerprint is
    /// out of date. Otherwise suspends, unless the request is a short poll or
    /// asked not to be held, until a change, the hold timeout or shutdown.
    /// A timeout yields an empty response.
    pub async fn poll(
        &self,
        request: PollRequest,
    ) -> Result<PollResponse> {
        if request.watched.is_empty() {
            return Err(PollError::EmptyWatchSet.into());
        }

        let changed = self.stale_keys(&request.watched, &request.labels);
        if !changed.is_empty() {
            return Ok(PollResponse::new(changed, PollResolution::Immediate));
        }

        let timeout = match request.intent {
            HoldIntent::ShortPoll => None,
            HoldIntent::LongPoll(client_timeout) => Some(self.config.hold_timeout(client_timeout)),
            HoldIntent::LegacyMarker => Some(self.config.legacy_hold_timeout()),
        };
        let timeout = match timeout {
            Some(timeout) if !request.no_hang_up => timeout,
            _ => return Ok(PollResponse::new(Vec::new(), PollResolution::NotHeld)),
        };
        if self.shutdown.is_cancelled() {
            return Ok(PollResponse::new(Vec::new(), PollResolution::Shutdown));
        }

        let (tx, mut rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let hold = Arc::new(PollHold::new(id, request, timeout, tx));
        let _registration = self.register(Arc::clone(&hold));

        // A publish landing between the first check and the registration
        // would have found no hold to wake.
        let changed = self.stale_keys(&hold.watched, &hold.labels);
        if !changed.is_empty() {
            hold.try_complete(changed, PollResolution::Changed);
        }

        tokio::select! {
            response = &mut rx => return Ok(response.unwrap_or_else(|_| empty(PollResolution::Shutdown))),
            _ = tokio::time::sleep_until(hold.deadline) => {
                hold.try_complete(Vec::new(), PollResolution::Timeout);
            }
            _ = self.shutdown.cancelled() => {
                hold.try_complete(Vec::new(), PollResolution::Shutdown);
            }
        }

        // Whichever path completed the hold has sent, or is about to send.
        Ok(rx.await.unwrap_or_else(|_| empty(PollResolution::Timeout)))
    }

    /// Wakes every hold under `key` whose watch set has gone stale.
    ///
    /// Must be called only after the write is visible to readers. Returns
    /// the number of holds woken.
    pub fn notify_changed(
        &self,
        key: &ConfigKey,
    ) -> usize {
        let candidates: Vec<Arc<PollHold>> = match self.holds.get(key) {
            Some(holds) => holds.values().cloned().collect(),
            None => return 0,
        };

        let mut woken = 0;
        for hold in candidates {
            if hold.is_completed() {
                continue;
            }
            let changed = self.stale_keys(&hold.watched, &hold.labels);
            if changed.is_empty() {
                continue;
            }
            if hold.try_complete(changed, PollResolution::Changed) {
                self.unregister(&hold);
                woken += 1;
            }
        }

        debug!(%key, woken, "Change notified to parked polls");
        woken
    }

    /// Releases every parked hold with an empty response; later polls are
    /// answered without being held.
    pub fn shutdown(&self) {
        debug!(holds = self.hold_count(), "Long poll coordinator shutting down");
        self.shutdown.cancel();
    }

    /// Distinct holds currently parked.
    pub fn hold_count(&self) -> usize {
        let mut ids = HashSet::new();
        for entry in self.holds.iter() {
            ids.extend(entry.value().keys().copied());
        }
        ids.len()
    }

    /// Holds registered under `key`.
    pub fn holds_for(
        &self,
        key: &ConfigKey,
    ) -> usize {
        self.holds.get(key).map(|h| h.len()).unwrap_or(0)
    }

    /// Keys whose current fingerprint, as seen by a client carrying
    /// `labels`, differs from the one it holds. A missing key reads as an
    /// empty fingerprint.
    fn stale_keys(
        &self,
        watched: &HashMap<ConfigKey, String>,
        labels: &ClientLabels,
    ) -> Vec<ConfigKey> {
        watched
            .iter()
            .filter(|(key, known)| {
                let snapshot = self.store.snapshot(key);
                let current = snapshot
                    .as_deref()
                    .map(|s| effective_fingerprint(s, labels))
                    .unwrap_or("");
                current != known.as_str()
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn register(
        &self,
        hold: Arc<PollHold>,
    ) -> HoldRegistration<'_> {
        for key in hold.watched.keys() {
            self.holds
                .entry(key.clone())
                .or_default()
                .insert(hold.id, Arc::clone(&hold));
        }
        metrics::HELD_POLLS_GAUGE.inc();
        trace!(
            hold_id = hold.id,
            keys = hold.watched.len(),
            deadline_ms = (hold.deadline - hold.arrived_at).as_millis() as u64,
            "Poll hold registered"
        );

        HoldRegistration {
            coordinator: self,
            hold,
        }
    }

    /// Idempotent.
    fn unregister(
        &self,
        hold: &PollHold,
    ) {
        for key in hold.watched.keys() {
            self.holds.remove_if_mut(key, |_key, holds| {
                holds.remove(&hold.id);
                holds.is_empty()
            });
        }
    }
}

fn empty(resolution: PollResolution) -> PollResponse {
    PollResponse::new(Vec::new(), resolution)
}
