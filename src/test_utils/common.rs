use std::sync::Arc;

use bytes::Bytes;

use crate::ClientLabels;
use crate::ConfHubConfig;
use crate::ConfigKey;
use crate::GrayRule;
use crate::MemoryConfigStore;
use crate::PublishMeta;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// `public>>DEFAULT_GROUP>><id>`
pub fn key(id: &str) -> ConfigKey {
    ConfigKey::new("", "DEFAULT_GROUP", id).unwrap()
}

pub fn labels(ip: &str) -> ClientLabels {
    ClientLabels::new().with_client_ip(ip)
}

pub fn test_store() -> Arc<MemoryConfigStore> {
    let config = ConfHubConfig::default();
    Arc::new(MemoryConfigStore::new(
        config.query.write_lock_retry_attempts,
        config.history.max_entries_per_key,
    ))
}

pub fn publish(
    store: &MemoryConfigStore,
    key: &ConfigKey,
    content: &'static str,
) -> String {
    store
        .publish(key, Bytes::from_static(content.as_bytes()), PublishMeta::default())
        .unwrap()
        .fingerprint
}

pub fn publish_beta(
    store: &MemoryConfigStore,
    key: &ConfigKey,
    ips: &str,
    content: &'static str,
) -> String {
    store
        .publish_gray(
            key,
            crate::constants::BETA_VARIANT_NAME,
            GrayRule::parse("beta", ips).unwrap(),
            None,
            Bytes::from_static(content.as_bytes()),
            PublishMeta::default(),
        )
        .unwrap()
        .fingerprint
}

pub fn publish_tag(
    store: &MemoryConfigStore,
    key: &ConfigKey,
    tag: &str,
    content: &'static str,
) -> String {
    store
        .publish_gray(
            key,
            &format!("{}{tag}", crate::constants::TAG_VARIANT_PREFIX),
            GrayRule::parse("tag", tag).unwrap(),
            None,
            Bytes::from_static(content.as_bytes()),
            PublishMeta::default(),
        )
        .unwrap()
        .fingerprint
}
