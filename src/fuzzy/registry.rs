use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::metrics;
use crate::pattern::filter_matched_patterns;
use crate::ConfigKey;
use crate::ConfigStore;
use crate::FuzzyWatchConfig;
use crate::PatternError;
use crate::PatternInterner;
use crate::Result;
use crate::WatchPattern;

/// Change of a pattern's matched set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyWatchDelta {
    /// Canonical pattern text
    pub pattern: Arc<str>,
    pub added: Vec<ConfigKey>,
    pub removed: Vec<ConfigKey>,
}

#[derive(Debug, Default)]
struct PatternState {
    /// Set once the initial sweep over existing keys ran
    swept: bool,
    matched: BTreeSet<ConfigKey>,
    subscribers: HashMap<u64, mpsc::Sender<FuzzyWatchDelta>>,
}

#[derive(Debug)]
struct PatternEntry {
    pattern: Arc<WatchPattern>,
    state: Mutex<PatternState>,
}

impl PatternEntry {
    /// Sends to every subscriber without waiting. A full channel drops the
    /// delta; a closed one drops the subscriber.
    fn broadcast(
        &self,
        state: &mut PatternState,
        delta: FuzzyWatchDelta,
    ) {
        state.subscribers.retain(|id, sender| match sender.try_send(delta.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = id, pattern = %delta.pattern, "Fuzzy watch buffer full, delta dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

#[derive(Debug)]
struct RegistryInner {
    entries: DashMap<Arc<str>, Arc<PatternEntry>>,
    interner: PatternInterner,
    next_subscriber_id: AtomicU64,
}

impl RegistryInner {
    fn remove_pattern(
        &self,
        text: &str,
    ) -> bool {
        let removed = self.entries.remove(text).is_some();
        if removed {
            self.interner.release(text);
            metrics::FUZZY_PATTERN_GAUGE.dec();
        }
        removed
    }
}

/// One subscriber's view of a pattern: the matched set at registration
/// followed by the deltas on `receiver`.
///
/// Dropping it unsubscribes; the pattern stays active while other
/// subscribers hold it.
#[derive(Debug)]
pub struct FuzzyWatchSubscription {
    id: u64,
    pattern: Arc<str>,
    initial: BTreeSet<ConfigKey>,
    receiver: mpsc::Receiver<FuzzyWatchDelta>,
    registry: Arc<RegistryInner>,
}

impl FuzzyWatchSubscription {
    pub fn pattern(&self) -> &Arc<str> {
        &self.pattern
    }

    /// Keys matching the pattern when the subscription was created.
    pub fn initial_keys(&self) -> &BTreeSet<ConfigKey> {
        &self.initial
    }

    pub fn receiver_mut(&mut self) -> &mut mpsc::Receiver<FuzzyWatchDelta> {
        &mut self.receiver
    }

    /// Next delta; `None` once the pattern was unregistered.
    pub async fn recv(&mut self) -> Option<FuzzyWatchDelta> {
        self.receiver.recv().await
    }
}

impl Drop for FuzzyWatchSubscription {
    fn drop(&mut self) {
        let Some(entry) = self.registry.entries.get(&self.pattern).map(|e| Arc::clone(e.value())) else {
            return;
        };
        let now_empty = {
            let mut state = entry.state.lock();
            state.subscribers.remove(&self.id);
            state.subscribers.is_empty()
        };
        if now_empty {
            // Re-check under the map's shard lock so a concurrent
            // subscriber joining the same pattern is never dropped.
            let removed = self
                .registry
                .entries
                .remove_if(&self.pattern, |_, e| e.state.lock().subscribers.is_empty())
                .is_some();
            if removed {
                self.registry.interner.release(&self.pattern);
                metrics::FUZZY_PATTERN_GAUGE.dec();
            }
        }
        trace!(subscriber = self.id, pattern = %self.pattern, "Fuzzy watch subscriber dropped");
    }
}

/// Tracks wildcard patterns and the keys currently matching each.
///
/// Key creation and removal are fed in by the publish path after the write
/// is visible. A new pattern sweeps the existing keys while holding its own
/// state lock, so a key created concurrently is reported exactly once:
/// either in the initial set or as an `added` delta.
#[derive(Clone)]
pub struct FuzzyWatchRegistry {
    inner: Arc<RegistryInner>,
    store: Arc<dyn ConfigStore>,
    config: FuzzyWatchConfig,
}

impl std::fmt::Debug for FuzzyWatchRegistry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("FuzzyWatchRegistry")
            .field("patterns", &self.inner.entries.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FuzzyWatchRegistry {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        config: FuzzyWatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries: DashMap::new(),
                interner: PatternInterner::new(),
                next_subscriber_id: AtomicU64::new(1),
            }),
            store,
            config,
        }
    }

    /// Subscribes to `pattern` (`namespace>>group>>resource`, blank
    /// namespace meaning the default one).
    pub fn register_fuzzy_watch(
        &self,
        pattern: &str,
    ) -> Result<FuzzyWatchSubscription> {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.config.subscriber_buffer_size);

        loop {
            let entry = self.entry_for(pattern)?;
            let text = entry.pattern.text().clone();
            let initial = {
                let mut state = entry.state.lock();
                if !state.swept {
                    // keys() is read under the state lock: creations landing
                    // after it block on this lock and then see the key present.
                    let swept: Vec<ConfigKey> = self
                        .store
                        .keys()
                        .into_iter()
                        .filter(|key| entry.pattern.matches(key))
                        .collect();
                    state.matched.extend(swept);
                    state.swept = true;
                }
                state.subscribers.insert(id, sender.clone());
                state.matched.clone()
            };

            let still_active = self
                .inner
                .entries
                .get(&text)
                .map(|e| Arc::ptr_eq(e.value(), &entry))
                .unwrap_or(false);
            if !still_active {
                // the last subscriber left and took the entry with it
                entry.state.lock().subscribers.remove(&id);
                continue;
            }

            debug!(subscriber = id, pattern = %text, matched = initial.len(), "Fuzzy watch registered");
            return Ok(FuzzyWatchSubscription {
                id,
                pattern: text,
                initial,
                receiver,
                registry: Arc::clone(&self.inner),
            });
        }
    }

    /// Removes `pattern` and all its subscribers, whose receivers then
    /// yield `None`. Returns `false` when the pattern was not active.
    pub fn unregister_fuzzy_watch(
        &self,
        pattern: &str,
    ) -> Result<bool> {
        let text = WatchPattern::canonical(pattern);
        let Some(entry) = self.inner.entries.get(text.as_ref()).map(|e| Arc::clone(e.value())) else {
            WatchPattern::parse(&text)?;
            return Ok(false);
        };
        entry.state.lock().subscribers.clear();
        let removed = self.inner.remove_pattern(&text);

        debug!(pattern = %text, removed, "Fuzzy watch unregistered");
        Ok(removed)
    }

    /// Current matched set of an active pattern.
    pub fn matched_keys(
        &self,
        pattern: &str,
    ) -> Result<Option<BTreeSet<ConfigKey>>> {
        let text = WatchPattern::canonical(pattern);
        match self.inner.entries.get(text.as_ref()) {
            Some(entry) => Ok(Some(entry.state.lock().matched.clone())),
            None => {
                WatchPattern::parse(&text)?;
                Ok(None)
            }
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Feeds a newly created key. Returns the number of patterns whose
    /// matched set changed.
    pub fn on_key_created(
        &self,
        key: &ConfigKey,
    ) -> usize {
        self.reconcile(key)
    }

    /// Feeds a removed key. Returns the number of patterns whose matched
    /// set changed.
    pub fn on_key_removed(
        &self,
        key: &ConfigKey,
    ) -> usize {
        self.reconcile(key)
    }

    /// Existing entries are found by canonical text alone; a pattern is
    /// compiled only when its entry is created.
    fn entry_for(
        &self,
        pattern: &str,
    ) -> Result<Arc<PatternEntry>> {
        let text = WatchPattern::canonical(pattern);
        if let Some(entry) = self.inner.entries.get(text.as_ref()) {
            return Ok(Arc::clone(entry.value()));
        }
        let compiled = WatchPattern::parse(&text)?;
        if self.inner.entries.len() >= self.config.max_patterns {
            return Err(PatternError::PatternLimitExceeded {
                limit: self.config.max_patterns,
            }
            .into());
        }

        let mut created = false;
        let entry = self
            .inner
            .entries
            .entry(compiled.text().clone())
            .or_insert_with(|| {
                created = true;
                Arc::new(PatternEntry {
                    pattern: self.inner.interner.intern(compiled),
                    state: Mutex::new(PatternState::default()),
                })
            })
            .clone();
        if created {
            metrics::FUZZY_PATTERN_GAUGE.inc();
        }
        Ok(entry)
    }

    /// Brings every pattern matching `key` in line with the store. Creation
    /// and removal notices of one key may arrive out of order, so the store
    /// decides membership, read under each pattern's state lock.
    fn reconcile(
        &self,
        key: &ConfigKey,
    ) -> usize {
        let entries: Vec<Arc<PatternEntry>> = self
            .inner
            .entries
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        let hits = filter_matched_patterns(entries.iter().map(|e| e.pattern.as_ref()), key);
        if hits.is_empty() {
            return 0;
        }

        let mut changed = 0;
        for entry in entries.iter().filter(|e| hits.contains(e.pattern.text())) {
            let mut state = entry.state.lock();
            let present = self.store.snapshot(key).is_some();
            let applied = if present {
                state.matched.insert(key.clone())
            } else {
                state.matched.remove(key)
            };
            if !applied {
                continue;
            }
            changed += 1;

            let (added, removed) = if present {
                (vec![key.clone()], Vec::new())
            } else {
                (Vec::new(), vec![key.clone()])
            };
            let delta = FuzzyWatchDelta {
                pattern: entry.pattern.text().clone(),
                added,
                removed,
            };
            entry.broadcast(&mut state, delta);
        }

        trace!(%key, patterns = changed, "Fuzzy watch sets reconciled");
        changed
    }
}
