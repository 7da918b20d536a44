use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;
use tracing::warn;

use super::fingerprint;
use super::history::HistoryLog;
use super::ConfigHistoryInfo;
use super::ConfigSnapshot;
use super::KeyLock;
use super::KeyReadGuard;
use super::KeyWriteGuard;
use super::Page;
use crate::constants::OP_DELETE;
use crate::constants::OP_INSERT;
use crate::constants::OP_UPDATE;
use crate::metrics;
use crate::utils::time::now_millis;
use crate::ConfigKey;
use crate::Error;
use crate::GrayRule;
use crate::GrayVariant;
use crate::PublishError;
use crate::QueryError;
use crate::Result;

const DEFAULT_CONTENT_TYPE: &str = "text";

/// Outcome of a non-blocking read-guard attempt.
#[derive(Debug)]
pub enum ReadAttempt {
    /// No snapshot exists for the key
    Absent,
    /// A writer currently holds the key
    Busy,
    Acquired(KeyReadGuard),
}

#[cfg(test)]
use mockall::automock;

/// Read side of the snapshot cache consumed by the query and poll paths.
#[cfg_attr(test, automock)]
pub trait ConfigStore: Send + Sync + 'static {
    fn snapshot(
        &self,
        key: &ConfigKey,
    ) -> Option<Arc<ConfigSnapshot>>;

    /// Default (non gray) content
    fn content(
        &self,
        key: &ConfigKey,
    ) -> Option<Bytes>;

    fn gray_content(
        &self,
        key: &ConfigKey,
        variant: &str,
    ) -> Option<Bytes>;

    fn try_read_guard(
        &self,
        key: &ConfigKey,
    ) -> ReadAttempt;

    /// Every key that currently has a snapshot
    fn keys(&self) -> Vec<ConfigKey>;
}

/// Metadata accompanying a publish.
#[derive(Debug, Clone, Default)]
pub struct PublishMeta {
    /// Keeps the current type (or `text`) when `None`
    pub content_type: Option<String>,
    pub src_ip: Option<String>,
    pub src_user: Option<String>,
    pub encrypted_data_key: Option<String>,
    /// Compare-and-swap: the publish only applies when the current
    /// fingerprint equals this value
    pub cas_md5: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub fingerprint: String,
    /// The key had no snapshot before this write
    pub created: bool,
    /// The served fingerprint differs from the previous one
    pub changed: bool,
}

#[derive(Debug, Default)]
struct CacheEntry {
    lock: Arc<KeyLock>,
    snapshot: ArcSwapOption<ConfigSnapshot>,
}

/// In-process snapshot cache with per-key write guards and bounded history.
///
/// Every mutation takes the key's write guard, writes content first and the
/// snapshot last, so a reader holding the read guard never sees a snapshot
/// whose content is not in place yet. Removed keys keep their (empty) entry
/// so the guard survives remove/re-create cycles.
#[derive(Debug)]
pub struct MemoryConfigStore {
    entries: DashMap<ConfigKey, Arc<CacheEntry>>,
    contents: DashMap<ConfigKey, Bytes>,
    gray_contents: DashMap<ConfigKey, HashMap<String, Bytes>>,
    history: HistoryLog,
    write_lock_retry_attempts: usize,
}

impl MemoryConfigStore {
    pub fn new(
        write_lock_retry_attempts: usize,
        max_history_per_key: usize,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            contents: DashMap::new(),
            gray_contents: DashMap::new(),
            history: HistoryLog::new(max_history_per_key),
            write_lock_retry_attempts: write_lock_retry_attempts.max(1),
        }
    }

    /// Writes the default content of `key`.
    pub fn publish(
        &self,
        key: &ConfigKey,
        content: Bytes,
        meta: PublishMeta,
    ) -> Result<PublishReceipt> {
        if content.is_empty() {
            return Err(PublishError::EmptyContent(key.clone()).into());
        }
        let md5 = fingerprint(&content);

        let entry = match self.entries.get(key).map(|e| Arc::clone(e.value())) {
            Some(entry) => entry,
            // a compare-and-swap can never succeed on a key that was never written
            None if meta.cas_md5.is_some() => return Err(cas_mismatch(key, &meta, None)),
            None => self
                .entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(CacheEntry::default()))
                .clone(),
        };
        let _guard = self.lock_for_write(key, &entry)?;

        let previous = entry.snapshot.load_full();
        if let Some(expected) = &meta.cas_md5 {
            let actual = previous.as_ref().map(|s| s.fingerprint.clone());
            if actual.as_deref() != Some(expected.as_str()) {
                return Err(cas_mismatch(key, &meta, actual));
            }
        }

        let now = now_millis();
        let mut snapshot = match &previous {
            Some(current) => (**current).clone(),
            None => ConfigSnapshot::new(md5.clone(), DEFAULT_CONTENT_TYPE, now),
        };
        if let Some(content_type) = &meta.content_type {
            snapshot.content_type = content_type.clone();
        }
        snapshot.fingerprint = md5.clone();
        snapshot.last_modified = now;
        snapshot.encrypted_data_key = meta.encrypted_data_key.clone();
        let content_type = snapshot.content_type.clone();

        self.contents.insert(key.clone(), content.clone());
        entry.snapshot.store(Some(Arc::new(snapshot)));

        let created = previous.is_none();
        let changed = previous.as_ref().map(|p| p.fingerprint != md5).unwrap_or(true);
        let op_type = if created { OP_INSERT } else { OP_UPDATE };
        self.history.append(ConfigHistoryInfo {
            id: 0,
            last_id: None,
            key: key.clone(),
            md5: md5.clone(),
            content,
            src_ip: meta.src_ip,
            src_user: meta.src_user,
            op_type,
            content_type,
            encrypted_data_key: meta.encrypted_data_key,
            created_time: now,
            last_modified_time: now,
        });
        metrics::PUBLISH_COUNTER.with_label_values(&[op_type]).inc();

        debug!(%key, md5 = %md5, created, changed, "Config published");
        Ok(PublishReceipt {
            fingerprint: md5,
            created,
            changed,
        })
    }

    /// Deletes `key` with all its gray variants. Returns `false` when absent.
    pub fn remove(
        &self,
        key: &ConfigKey,
        meta: PublishMeta,
    ) -> Result<bool> {
        let Some(entry) = self.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return Ok(false);
        };
        let _guard = self.lock_for_write(key, &entry)?;

        let Some(previous) = entry.snapshot.swap(None) else {
            return Ok(false);
        };
        let content = self.contents.remove(key).map(|(_, c)| c).unwrap_or_default();
        self.gray_contents.remove(key);

        let now = now_millis();
        self.history.append(ConfigHistoryInfo {
            id: 0,
            last_id: None,
            key: key.clone(),
            md5: previous.fingerprint.clone(),
            content,
            src_ip: meta.src_ip,
            src_user: meta.src_user,
            op_type: OP_DELETE,
            content_type: previous.content_type.clone(),
            encrypted_data_key: previous.encrypted_data_key.clone(),
            created_time: now,
            last_modified_time: now,
        });
        metrics::PUBLISH_COUNTER.with_label_values(&[OP_DELETE]).inc();

        debug!(%key, "Config removed");
        Ok(true)
    }

    /// Creates or replaces the gray variant `name` of an existing key.
    ///
    /// `priority` defaults to the rule kind's default priority.
    pub fn publish_gray(
        &self,
        key: &ConfigKey,
        name: &str,
        rule: GrayRule,
        priority: Option<i32>,
        content: Bytes,
        meta: PublishMeta,
    ) -> Result<PublishReceipt> {
        if content.is_empty() {
            return Err(PublishError::EmptyContent(key.clone()).into());
        }
        let Some(entry) = self.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return Err(QueryError::NotFound(key.clone()).into());
        };
        let _guard = self.lock_for_write(key, &entry)?;

        let Some(current) = entry.snapshot.load_full() else {
            return Err(QueryError::NotFound(key.clone()).into());
        };

        let md5 = fingerprint(&content);
        let previous = current.variant(name).cloned();
        let priority = priority.unwrap_or_else(|| rule.default_priority());
        // a new rule or priority changes which clients see the variant
        let changed = previous
            .as_ref()
            .map(|v| v.fingerprint != md5 || v.rule != rule || v.priority != priority)
            .unwrap_or(true);

        let mut snapshot = (*current).clone();
        snapshot.upsert_variant(GrayVariant {
            name: name.to_string(),
            fingerprint: md5.clone(),
            last_modified: now_millis(),
            rule,
            priority,
            encrypted_data_key: meta.encrypted_data_key,
        });

        self.gray_contents
            .entry(key.clone())
            .or_default()
            .insert(name.to_string(), content);
        entry.snapshot.store(Some(Arc::new(snapshot)));

        debug!(%key, variant = name, md5 = %md5, priority, changed, "Gray variant published");
        Ok(PublishReceipt {
            created: previous.is_none(),
            changed,
            fingerprint: md5,
        })
    }

    pub fn remove_gray(
        &self,
        key: &ConfigKey,
        name: &str,
    ) -> Result<()> {
        let missing = || PublishError::MissingVariant {
            key: key.clone(),
            name: name.to_string(),
        };

        let Some(entry) = self.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return Err(missing().into());
        };
        let _guard = self.lock_for_write(key, &entry)?;

        let Some(current) = entry.snapshot.load_full() else {
            return Err(missing().into());
        };
        let mut snapshot = (*current).clone();
        if snapshot.remove_variant(name).is_none() {
            return Err(missing().into());
        }

        entry.snapshot.store(Some(Arc::new(snapshot)));
        if let Some(mut contents) = self.gray_contents.get_mut(key) {
            contents.remove(name);
        }

        debug!(%key, variant = name, "Gray variant removed");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Newest first.
    pub fn history_page(
        &self,
        key: &ConfigKey,
        page_number: usize,
        page_size: usize,
    ) -> Page<ConfigHistoryInfo> {
        self.history.page(key, page_number, page_size)
    }

    pub fn history_detail(
        &self,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        self.history.detail(id)
    }

    pub fn previous_history(
        &self,
        key: &ConfigKey,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        self.history.previous(key, id)
    }

    fn lock_for_write(
        &self,
        key: &ConfigKey,
        entry: &CacheEntry,
    ) -> Result<KeyWriteGuard> {
        for _ in 0..self.write_lock_retry_attempts {
            if let Some(guard) = entry.lock.try_write() {
                return Ok(guard);
            }
            std::thread::yield_now();
        }
        warn!(%key, attempts = self.write_lock_retry_attempts, "Write guard still busy");
        Err(PublishError::WriteConflict(key.clone()).into())
    }
}

impl ConfigStore for MemoryConfigStore {
    fn snapshot(
        &self,
        key: &ConfigKey,
    ) -> Option<Arc<ConfigSnapshot>> {
        self.entries.get(key).and_then(|e| e.snapshot.load_full())
    }

    fn content(
        &self,
        key: &ConfigKey,
    ) -> Option<Bytes> {
        self.contents.get(key).map(|c| c.value().clone())
    }

    fn gray_content(
        &self,
        key: &ConfigKey,
        variant: &str,
    ) -> Option<Bytes> {
        self.gray_contents.get(key).and_then(|c| c.get(variant).cloned())
    }

    fn try_read_guard(
        &self,
        key: &ConfigKey,
    ) -> ReadAttempt {
        let Some(entry) = self.entries.get(key).map(|e| Arc::clone(e.value())) else {
            return ReadAttempt::Absent;
        };
        match entry.lock.try_read() {
            Some(guard) if entry.snapshot.load().is_some() => ReadAttempt::Acquired(guard),
            Some(_) => ReadAttempt::Absent,
            None => ReadAttempt::Busy,
        }
    }

    fn keys(&self) -> Vec<ConfigKey> {
        self.entries
            .iter()
            .filter(|e| e.value().snapshot.load().is_some())
            .map(|e| e.key().clone())
            .collect()
    }
}

fn cas_mismatch(
    key: &ConfigKey,
    meta: &PublishMeta,
    actual: Option<String>,
) -> Error {
    PublishError::CasMismatch {
        key: key.clone(),
        expected: meta.cas_md5.clone().unwrap_or_default(),
        actual,
    }
    .into()
}
