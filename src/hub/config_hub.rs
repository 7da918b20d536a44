use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::constants::BETA_VARIANT_NAME;
use crate::constants::TAG_VARIANT_PREFIX;
use crate::ClientLabels;
use crate::ConfHubConfig;
use crate::ConfigHistoryInfo;
use crate::ConfigKey;
use crate::FuzzyWatchRegistry;
use crate::FuzzyWatchSubscription;
use crate::GrayRule;
use crate::LongPollCoordinator;
use crate::MemoryConfigStore;
use crate::Page;
use crate::PollRequest;
use crate::PollResponse;
use crate::PublishMeta;
use crate::PublishReceipt;
use crate::QueryOutcome;
use crate::QueryRequest;
use crate::QueryResolutionChain;
use crate::Result;

/// One instance per process. Reads go through the resolution chain; every
/// mutation commits to the store first and only then notifies parked polls
/// and fuzzy watchers.
#[derive(Debug)]
pub struct ConfigHub {
    pub(super) config: ConfHubConfig,
    pub(super) store: Arc<MemoryConfigStore>,
    pub(super) chain: QueryResolutionChain,
    pub(super) coordinator: Arc<LongPollCoordinator>,
    pub(super) fuzzy: FuzzyWatchRegistry,
}

impl ConfigHub {
    // -
    // Reads

    /// Resolves the content `labels` should see for `key`.
    pub fn resolve(
        &self,
        key: &ConfigKey,
        labels: ClientLabels,
        requested_tag: Option<&str>,
    ) -> QueryOutcome {
        let mut request = QueryRequest::new(key.clone(), labels);
        if let Some(tag) = requested_tag.filter(|t| !t.trim().is_empty()) {
            request = request.with_requested_tag(tag);
        }
        self.chain.resolve(&request)
    }

    pub fn resolve_request(
        &self,
        request: &QueryRequest,
    ) -> QueryOutcome {
        self.chain.resolve(request)
    }

    pub async fn long_poll(
        &self,
        request: PollRequest,
    ) -> Result<PollResponse> {
        self.coordinator.poll(request).await
    }

    pub fn register_fuzzy_watch(
        &self,
        pattern: &str,
    ) -> Result<FuzzyWatchSubscription> {
        self.fuzzy.register_fuzzy_watch(pattern)
    }

    pub fn unregister_fuzzy_watch(
        &self,
        pattern: &str,
    ) -> Result<bool> {
        self.fuzzy.unregister_fuzzy_watch(pattern)
    }

    // -
    // Writes

    pub fn publish(
        &self,
        key: &ConfigKey,
        content: impl Into<Bytes>,
        meta: PublishMeta,
    ) -> Result<PublishReceipt> {
        let receipt = self.store.publish(key, content.into(), meta)?;
        if receipt.changed {
            self.coordinator.notify_changed(key);
        }
        if receipt.created {
            self.fuzzy.on_key_created(key);
        }
        Ok(receipt)
    }

    /// Publishes only if the current fingerprint equals `expected_md5`.
    pub fn publish_cas(
        &self,
        key: &ConfigKey,
        content: impl Into<Bytes>,
        expected_md5: &str,
        meta: PublishMeta,
    ) -> Result<PublishReceipt> {
        self.publish(
            key,
            content,
            PublishMeta {
                cas_md5: Some(expected_md5.to_string()),
                ..meta
            },
        )
    }

    /// Returns `false` when the key did not exist.
    pub fn remove(
        &self,
        key: &ConfigKey,
        meta: PublishMeta,
    ) -> Result<bool> {
        let removed = self.store.remove(key, meta)?;
        if removed {
            self.coordinator.notify_changed(key);
            self.fuzzy.on_key_removed(key);
        }
        Ok(removed)
    }

    /// Publishes gray content under a rule built from `kind` and
    /// `raw_expression`. The variant is named `beta` or `tag_<tag>`.
    pub fn publish_gray(
        &self,
        key: &ConfigKey,
        kind: &str,
        raw_expression: &str,
        priority: Option<i32>,
        content: impl Into<Bytes>,
        meta: PublishMeta,
    ) -> Result<PublishReceipt> {
        let rule = GrayRule::parse(kind, raw_expression)?;
        let name = variant_name(&rule);
        let receipt = self
            .store
            .publish_gray(key, &name, rule, priority, content.into(), meta)?;

        debug!(%key, variant = %name, changed = receipt.changed, "Gray publish committed");
        if receipt.changed {
            self.coordinator.notify_changed(key);
        }
        Ok(receipt)
    }

    pub fn remove_gray(
        &self,
        key: &ConfigKey,
        name: &str,
    ) -> Result<()> {
        self.store.remove_gray(key, name)?;
        self.coordinator.notify_changed(key);
        Ok(())
    }

    // -
    // History

    /// Newest first. `page_size` defaults to the configured page size.
    pub fn history_page(
        &self,
        key: &ConfigKey,
        page_number: usize,
        page_size: Option<usize>,
    ) -> Page<ConfigHistoryInfo> {
        let page_size = page_size.unwrap_or(self.config.history.default_page_size);
        self.store.history_page(key, page_number, page_size)
    }

    pub fn history_detail(
        &self,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        self.store.history_detail(id)
    }

    pub fn previous_history(
        &self,
        key: &ConfigKey,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        self.store.previous_history(key, id)
    }

    // -
    // Lifecycle and components

    /// Releases parked polls; later polls are answered without being held.
    pub fn shutdown(&self) {
        self.coordinator.shutdown();
    }

    pub fn config(&self) -> &ConfHubConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryConfigStore> {
        &self.store
    }

    pub fn chain(&self) -> &QueryResolutionChain {
        &self.chain
    }

    pub fn coordinator(&self) -> &Arc<LongPollCoordinator> {
        &self.coordinator
    }

    pub fn fuzzy(&self) -> &FuzzyWatchRegistry {
        &self.fuzzy
    }
}

fn variant_name(rule: &GrayRule) -> String {
    match rule {
        GrayRule::Beta(_) => BETA_VARIANT_NAME.to_string(),
        GrayRule::Tag(tag) => format!("{TAG_VARIANT_PREFIX}{}", tag.tag()),
    }
}
