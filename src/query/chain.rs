use std::sync::Arc;

use tracing::debug;
use tracing::trace;

use super::effective_fingerprint;
use super::DefaultConfigResolver;
use super::GrayRuleMatchResolver;
use super::QueryContext;
use super::QueryOutcome;
use super::QueryRequest;
use super::QueryResolver;
use super::VariantInfo;
use crate::constants::PULL_EVENT;
use crate::constants::PULL_TYPE_NOT_FOUND;
use crate::constants::PULL_TYPE_OK;
use crate::constants::TAG_RULE_TYPE;
use crate::metrics;
use crate::utils::time::millis_since;
use crate::ClientLabels;
use crate::ConfigKey;
use crate::ConfigStore;
use crate::QueryConfig;
use crate::ReadAttempt;
use crate::TraceRecord;
use crate::TraceSink;

/// Ordered, fixed chain of resolvers built once at startup.
pub struct QueryResolutionChain {
    resolvers: Vec<Box<dyn QueryResolver>>,
    store: Arc<dyn ConfigStore>,
    trace_sink: Arc<dyn TraceSink>,
    conflict_retry_attempts: usize,
}

impl std::fmt::Debug for QueryResolutionChain {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let names: Vec<&str> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("QueryResolutionChain")
            .field("resolvers", &names)
            .field("conflict_retry_attempts", &self.conflict_retry_attempts)
            .finish_non_exhaustive()
    }
}

impl QueryResolutionChain {
    /// Default chain: gray rule match first, then the default content.
    pub fn new(
        store: Arc<dyn ConfigStore>,
        trace_sink: Arc<dyn TraceSink>,
        config: &QueryConfig,
    ) -> Self {
        Self::with_resolvers(
            store,
            trace_sink,
            config,
            vec![
                Box::new(GrayRuleMatchResolver),
                Box::new(DefaultConfigResolver),
            ],
        )
    }

    /// Chain with an explicit resolver order (first claimant wins).
    pub fn with_resolvers(
        store: Arc<dyn ConfigStore>,
        trace_sink: Arc<dyn TraceSink>,
        config: &QueryConfig,
        resolvers: Vec<Box<dyn QueryResolver>>,
    ) -> Self {
        Self {
            resolvers,
            store,
            trace_sink,
            conflict_retry_attempts: config.conflict_retry_attempts.max(1),
        }
    }

    /// Resolves one read request.
    ///
    /// Never blocks on a writer: the key's read guard is attempted a bounded
    /// number of times and `Conflict` is returned if it stays busy.
    pub fn resolve(
        &self,
        request: &QueryRequest,
    ) -> QueryOutcome {
        let outcome = self.resolve_inner(request);

        metrics::RESOLVE_OUTCOME_COUNTER
            .with_label_values(&[outcome.status()])
            .inc();
        if outcome != QueryOutcome::Conflict {
            self.emit_trace(request, &outcome);
        }
        outcome
    }

    /// Snapshot fingerprint the client carrying `labels` should hold,
    /// `None` when the key does not exist.
    pub fn current_fingerprint(
        &self,
        key: &ConfigKey,
        labels: &ClientLabels,
    ) -> Option<String> {
        self.store
            .snapshot(key)
            .map(|s| effective_fingerprint(&s, labels).to_string())
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    fn resolve_inner(
        &self,
        request: &QueryRequest,
    ) -> QueryOutcome {
        let mut guard = None;
        let mut busy = false;
        for attempt in 1..=self.conflict_retry_attempts {
            match self.store.try_read_guard(&request.key) {
                ReadAttempt::Acquired(g) => {
                    guard = Some(g);
                    busy = false;
                    break;
                }
                ReadAttempt::Absent => {
                    busy = false;
                    break;
                }
                ReadAttempt::Busy => {
                    trace!(key = %request.key, attempt, "Read guard busy");
                    busy = true;
                    std::thread::yield_now();
                }
            }
        }
        if busy {
            debug!(key = %request.key, "Config is being modified, reporting conflict");
            return QueryOutcome::Conflict;
        }

        let snapshot = guard.as_ref().and_then(|_| self.store.snapshot(&request.key));
        let ctx = QueryContext {
            request,
            snapshot: snapshot.as_deref(),
            store: self.store.as_ref(),
        };

        let outcome = self
            .resolvers
            .iter()
            .find(|r| r.can_handle(&ctx))
            .map(|r| {
                trace!(key = %request.key, resolver = r.name(), "Resolver claimed request");
                r.handle(&ctx)
            })
            .unwrap_or(QueryOutcome::NotFound);

        drop(guard);
        outcome
    }

    fn emit_trace(
        &self,
        request: &QueryRequest,
        outcome: &QueryOutcome,
    ) {
        let record = match outcome.resolved() {
            Some(resolved) => {
                let event = match &resolved.variant {
                    VariantInfo::Beta(v) | VariantInfo::Tag(v) => format!("{PULL_EVENT}-{}", v.name),
                    VariantInfo::TagNotFound(tag) => format!("{PULL_EVENT}-{TAG_RULE_TYPE}-{tag}"),
                    VariantInfo::None => PULL_EVENT.to_string(),
                };
                TraceRecord {
                    key: request.key.clone(),
                    client_ip: request.labels.client_ip().map(str::to_string),
                    fingerprint: Some(resolved.fingerprint.clone()),
                    variant: resolved.variant.variant_name().map(str::to_string),
                    event,
                    pull_type: PULL_TYPE_OK,
                    delay_ms: if request.notify {
                        -1
                    } else {
                        millis_since(resolved.last_modified)
                    },
                    notify: request.notify,
                }
            }
            None => TraceRecord {
                key: request.key.clone(),
                client_ip: request.labels.client_ip().map(str::to_string),
                fingerprint: None,
                variant: None,
                event: PULL_EVENT.to_string(),
                pull_type: PULL_TYPE_NOT_FOUND,
                delay_ms: -1,
                notify: request.notify,
            },
        };
        self.trace_sink.emit(record);
    }
}
