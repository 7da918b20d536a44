use bytes::Bytes;

use super::*;
use crate::ConfigKey;
use crate::Error;
use crate::GrayRule;
use crate::PublishError;
use crate::QueryError;

fn store() -> MemoryConfigStore {
    MemoryConfigStore::new(16, 3)
}

fn key(id: &str) -> ConfigKey {
    ConfigKey::new("public", "DEFAULT_GROUP", id).unwrap()
}

#[test]
fn publish_creates_snapshot_with_md5_fingerprint() {
    let store = store();
    let key = key("app.properties");

    let receipt = store
        .publish(&key, Bytes::from("a=1"), PublishMeta::default())
        .unwrap();

    assert!(receipt.created);
    assert!(receipt.changed);
    assert_eq!(receipt.fingerprint, fingerprint(b"a=1"));

    let snapshot = store.snapshot(&key).unwrap();
    assert_eq!(snapshot.fingerprint, receipt.fingerprint);
    assert_eq!(snapshot.content_type, "text");
    assert_eq!(store.content(&key), Some(Bytes::from("a=1")));
    assert_eq!(store.keys(), vec![key]);
}

#[test]
fn republishing_same_content_is_not_a_change() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("a=1"), PublishMeta::default()).unwrap();

    let receipt = store
        .publish(&key, Bytes::from("a=1"), PublishMeta::default())
        .unwrap();

    assert!(!receipt.created);
    assert!(!receipt.changed);
}

#[test]
fn empty_content_is_rejected() {
    let store = store();

    let result = store.publish(&key("a"), Bytes::new(), PublishMeta::default());

    assert!(matches!(
        result,
        Err(Error::Publish(PublishError::EmptyContent(_)))
    ));
}

#[test]
fn cas_publish_requires_current_fingerprint() {
    let store = store();
    let key = key("app.properties");
    let first = store.publish(&key, Bytes::from("v1"), PublishMeta::default()).unwrap();

    let stale = PublishMeta {
        cas_md5: Some("not-the-md5".into()),
        ..Default::default()
    };
    let result = store.publish(&key, Bytes::from("v2"), stale);
    assert!(matches!(
        result,
        Err(Error::Publish(PublishError::CasMismatch { .. }))
    ));

    let fresh = PublishMeta {
        cas_md5: Some(first.fingerprint),
        ..Default::default()
    };
    assert!(store.publish(&key, Bytes::from("v2"), fresh).unwrap().changed);
}

#[test]
fn remove_drops_snapshot_and_contents() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("v1"), PublishMeta::default()).unwrap();

    assert!(store.remove(&key, PublishMeta::default()).unwrap());
    assert!(store.snapshot(&key).is_none());
    assert!(store.content(&key).is_none());
    assert!(store.keys().is_empty());
    assert!(matches!(store.try_read_guard(&key), ReadAttempt::Absent));

    assert!(!store.remove(&key, PublishMeta::default()).unwrap());
}

#[test]
fn gray_publish_requires_existing_key() {
    let store = store();
    let rule = GrayRule::parse("beta", "10.0.0.5").unwrap();

    let result = store.publish_gray(
        &key("missing"),
        "beta",
        rule,
        None,
        Bytes::from("gray"),
        PublishMeta::default(),
    );

    assert!(matches!(result, Err(Error::Query(QueryError::NotFound(_)))));
}

#[test]
fn gray_variants_are_ordered_by_priority_then_write_order() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("base"), PublishMeta::default()).unwrap();

    let tag = |t: &str| GrayRule::parse("tag", t).unwrap();
    store
        .publish_gray(&key, "low", tag("a"), Some(1), Bytes::from("l"), PublishMeta::default())
        .unwrap();
    store
        .publish_gray(&key, "tie-1", tag("b"), Some(5), Bytes::from("t1"), PublishMeta::default())
        .unwrap();
    store
        .publish_gray(&key, "tie-2", tag("c"), Some(5), Bytes::from("t2"), PublishMeta::default())
        .unwrap();
    // rewriting tie-1 moves it behind tie-2
    store
        .publish_gray(&key, "tie-1", tag("b"), Some(5), Bytes::from("t1b"), PublishMeta::default())
        .unwrap();

    let snapshot = store.snapshot(&key).unwrap();
    let names: Vec<&str> = snapshot.variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["tie-2", "tie-1", "low"]);
    assert_eq!(store.gray_content(&key, "tie-1"), Some(Bytes::from("t1b")));
}

#[test]
fn remove_gray_reports_missing_variant() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("base"), PublishMeta::default()).unwrap();
    store
        .publish_gray(
            &key,
            "beta",
            GrayRule::parse("beta", "10.0.0.5").unwrap(),
            None,
            Bytes::from("gray"),
            PublishMeta::default(),
        )
        .unwrap();

    store.remove_gray(&key, "beta").unwrap();
    assert!(store.snapshot(&key).unwrap().variants.is_empty());
    assert!(store.gray_content(&key, "beta").is_none());

    assert!(matches!(
        store.remove_gray(&key, "beta"),
        Err(Error::Publish(PublishError::MissingVariant { .. }))
    ));
}

#[test]
fn busy_write_guard_is_reported_to_readers_and_writers() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("v1"), PublishMeta::default()).unwrap();

    let reader = match store.try_read_guard(&key) {
        ReadAttempt::Acquired(guard) => guard,
        other => panic!("expected guard, got {other:?}"),
    };

    // A held read guard blocks writers past their retry budget.
    let result = store.publish(&key, Bytes::from("v2"), PublishMeta::default());
    assert!(matches!(
        result,
        Err(Error::Publish(PublishError::WriteConflict(_)))
    ));

    drop(reader);
    assert!(store.publish(&key, Bytes::from("v2"), PublishMeta::default()).is_ok());
}

#[test]
fn history_pages_newest_first_and_links_previous() {
    let store = store();
    let key = key("app.properties");
    for content in ["v1", "v2", "v3", "v4"] {
        store.publish(&key, Bytes::from(content), PublishMeta::default()).unwrap();
    }

    // bounded to 3 entries per key
    let page = store.history_page(&key, 1, 2);
    assert_eq!(page.total_count, 3);
    assert_eq!(page.pages_available, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].content, Bytes::from("v4"));
    assert_eq!(page.items[0].op_type, "U");

    let newest = &page.items[0];
    let previous = store.previous_history(&key, newest.id).unwrap();
    assert_eq!(previous.content, Bytes::from("v3"));
    assert_eq!(store.history_detail(previous.id), Some(previous.clone()));

    let second_page = store.history_page(&key, 2, 2);
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].content, Bytes::from("v2"));

    store.remove(&key, PublishMeta::default()).unwrap();
    assert_eq!(store.history_page(&key, 1, 10).items[0].op_type, "D");
}

#[test]
fn cas_publish_on_unknown_key_leaves_no_entry() {
    let store = store();
    let key = key("never-written");
    let meta = PublishMeta {
        cas_md5: Some("abc".into()),
        ..Default::default()
    };

    let result = store.publish(&key, Bytes::from("v1"), meta);
    assert!(matches!(
        result,
        Err(Error::Publish(PublishError::CasMismatch { actual: None, .. }))
    ));
    assert_eq!(store.entry_count(), 0);
    assert!(store.snapshot(&key).is_none());
}

#[test]
fn gray_rule_change_with_same_content_counts_as_change() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("base"), PublishMeta::default()).unwrap();
    let beta = |ips: &str| GrayRule::parse("beta", ips).unwrap();

    let first = store
        .publish_gray(&key, "beta", beta("10.0.0.5"), None, Bytes::from("gray"), PublishMeta::default())
        .unwrap();
    assert!(first.created && first.changed);

    let same = store
        .publish_gray(&key, "beta", beta("10.0.0.5"), None, Bytes::from("gray"), PublishMeta::default())
        .unwrap();
    assert!(!same.changed);

    let widened = store
        .publish_gray(&key, "beta", beta("10.0.0.5,10.0.0.6"), None, Bytes::from("gray"), PublishMeta::default())
        .unwrap();
    assert!(!widened.created);
    assert!(widened.changed);

    let reprioritised = store
        .publish_gray(&key, "beta", beta("10.0.0.5,10.0.0.6"), Some(7), Bytes::from("gray"), PublishMeta::default())
        .unwrap();
    assert!(reprioritised.changed);
}

#[test]
fn history_page_far_past_the_end_is_empty() {
    let store = store();
    let key = key("app.properties");
    store.publish(&key, Bytes::from("v1"), PublishMeta::default()).unwrap();

    let page = store.history_page(&key, usize::MAX, 20);
    assert_eq!(page.total_count, 1);
    assert!(page.items.is_empty());

    let page = store.history_page(&key, usize::MAX, usize::MAX);
    assert!(page.items.is_empty());
}
