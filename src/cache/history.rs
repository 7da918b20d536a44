use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use dashmap::DashMap;

use crate::ConfigKey;

/// One recorded mutation of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigHistoryInfo {
    pub id: u64,
    /// Id of the previous record for the same key, `None` for the first
    pub last_id: Option<u64>,
    pub key: ConfigKey,
    pub md5: String,
    pub content: Bytes,
    pub src_ip: Option<String>,
    pub src_user: Option<String>,
    /// `I` insert, `U` update, `D` delete
    pub op_type: &'static str,
    pub content_type: String,
    pub encrypted_data_key: Option<String>,
    pub created_time: u64,
    pub last_modified_time: u64,
}

/// A page of results. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub total_count: usize,
    pub page_number: usize,
    pub pages_available: usize,
    pub items: Vec<T>,
}

/// Bounded per-key history, newest last.
#[derive(Debug)]
pub(crate) struct HistoryLog {
    next_id: AtomicU64,
    max_entries_per_key: usize,
    by_key: DashMap<ConfigKey, VecDeque<ConfigHistoryInfo>>,
}

impl HistoryLog {
    pub(crate) fn new(max_entries_per_key: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            max_entries_per_key: max_entries_per_key.max(1),
            by_key: DashMap::new(),
        }
    }

    /// Appends a record, filling in `id` and `last_id`.
    pub(crate) fn append(
        &self,
        mut record: ConfigHistoryInfo,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.by_key.entry(record.key.clone()).or_default();

        record.id = id;
        record.last_id = entries.back().map(|r| r.id);
        entries.push_back(record);
        while entries.len() > self.max_entries_per_key {
            entries.pop_front();
        }
        id
    }

    pub(crate) fn page(
        &self,
        key: &ConfigKey,
        page_number: usize,
        page_size: usize,
    ) -> Page<ConfigHistoryInfo> {
        let page_number = page_number.max(1);
        let page_size = page_size.max(1);

        let Some(entries) = self.by_key.get(key) else {
            return Page {
                total_count: 0,
                page_number,
                pages_available: 0,
                items: Vec::new(),
            };
        };

        let total_count = entries.len();
        let items = entries
            .iter()
            .rev()
            .skip(page_number.saturating_sub(1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();

        Page {
            total_count,
            page_number,
            pages_available: total_count.div_ceil(page_size),
            items,
        }
    }

    pub(crate) fn detail(
        &self,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        self.by_key
            .iter()
            .find_map(|entries| entries.iter().find(|r| r.id == id).cloned())
    }

    /// Record written just before `id` for the same key.
    pub(crate) fn previous(
        &self,
        key: &ConfigKey,
        id: u64,
    ) -> Option<ConfigHistoryInfo> {
        let entries = self.by_key.get(key)?;
        let current = entries.iter().find(|r| r.id == id)?;
        let last_id = current.last_id?;
        entries.iter().find(|r| r.id == last_id).cloned()
    }
}
