use confhub::ConfigKey;
use confhub::PublishMeta;

use crate::commons::hub;

#[tokio::test]
async fn fuzzy_watch_follows_creation_and_removal() {
    let hub = hub();
    let existing = ConfigKey::new("", "ORDER", "order-service.yaml").unwrap();
    hub.publish(&existing, "a", PublishMeta::default()).unwrap();

    let mut subscription = hub.register_fuzzy_watch(">>ORDER>>*-service.yaml").unwrap();
    assert_eq!(subscription.initial_keys().len(), 1);
    assert!(subscription.initial_keys().contains(&existing));

    let created = ConfigKey::new("", "ORDER", "billing-service.yaml").unwrap();
    hub.publish(&created, "b", PublishMeta::default()).unwrap();
    // updates of an already matched key are not membership changes
    hub.publish(&created, "b2", PublishMeta::default()).unwrap();
    hub.publish(
        &ConfigKey::new("", "ORDER", "billing.properties").unwrap(),
        "c",
        PublishMeta::default(),
    )
    .unwrap();

    let delta = subscription.recv().await.unwrap();
    assert_eq!(delta.added, vec![created.clone()]);

    hub.remove(&existing, PublishMeta::default()).unwrap();
    let delta = subscription.recv().await.unwrap();
    assert_eq!(delta.removed, vec![existing]);
    assert!(subscription.receiver_mut().try_recv().is_err());

    assert!(hub.unregister_fuzzy_watch(">>ORDER>>*-service.yaml").unwrap());
    assert!(subscription.recv().await.is_none());
}
