use bytes::Bytes;
use confhub::fingerprint;
use confhub::PublishMeta;
use confhub::QueryError;
use confhub::QueryOutcome;
use confhub::VariantInfo;

use crate::commons::client;
use crate::commons::enable_logger;
use crate::commons::hub;
use crate::commons::key;

#[test]
fn beta_rule_selects_variant_by_client_ip() {
    enable_logger();
    let hub = hub();
    let k = key("app.properties");
    hub.publish(&k, "timeout=30", PublishMeta::default()).unwrap();
    hub.publish_gray(&k, "beta", "10.0.0.5", None, "timeout=10", PublishMeta::default())
        .unwrap();

    let beta = hub.resolve(&k, client("10.0.0.5"), None);
    let resolved = beta.resolved().unwrap();
    assert!(matches!(resolved.variant, VariantInfo::Beta(_)));
    assert_eq!(resolved.fingerprint, fingerprint(b"timeout=10"));
    assert_eq!(resolved.content, Bytes::from_static(b"timeout=10"));

    let default = hub.resolve(&k, client("10.0.0.6"), None);
    let resolved = default.resolved().unwrap();
    assert_eq!(resolved.variant, VariantInfo::None);
    assert_eq!(resolved.fingerprint, fingerprint(b"timeout=30"));
}

#[test]
fn unknown_tag_is_reported_distinctly() {
    let hub = hub();
    let k = key("app.properties");
    hub.publish(&k, "timeout=30", PublishMeta::default()).unwrap();

    let outcome = hub.resolve(&k, client("10.0.0.6"), Some("v9"));

    assert_eq!(
        outcome.into_result(&k),
        Err(QueryError::TagNotFound {
            key: k.clone(),
            tag: "v9".into()
        })
    );
}

#[test]
fn removed_key_is_not_found() {
    let hub = hub();
    let k = key("app.properties");
    hub.publish(&k, "timeout=30", PublishMeta::default()).unwrap();
    hub.publish_gray(&k, "tag", "canary", None, "timeout=5", PublishMeta::default())
        .unwrap();

    assert!(hub.remove(&k, PublishMeta::default()).unwrap());

    assert_eq!(hub.resolve(&k, client("10.0.0.5"), None), QueryOutcome::NotFound);
    assert_eq!(
        hub.resolve(&k, client("10.0.0.5"), Some("canary")),
        QueryOutcome::NotFound
    );
    assert!(!hub.remove(&k, PublishMeta::default()).unwrap());
}

#[test]
fn cas_publish_and_history_chain() {
    let hub = hub();
    let k = key("app.properties");
    let first = hub.publish(&k, "v1", PublishMeta::default()).unwrap();
    assert!(hub
        .publish_cas(&k, "v2", "not-the-md5", PublishMeta::default())
        .is_err());
    hub.publish_cas(&k, "v2", &first.fingerprint, PublishMeta::default())
        .unwrap();

    let page = hub.history_page(&k, 1, None);
    assert_eq!(page.total_count, 2);
    let newest = &page.items[0];
    assert_eq!(newest.content, Bytes::from_static(b"v2"));

    let previous = hub.previous_history(&k, newest.id).unwrap();
    assert_eq!(previous.md5, first.fingerprint);
    assert_eq!(previous.op_type, "I");
    assert_eq!(hub.history_detail(previous.id), Some(previous));
}
