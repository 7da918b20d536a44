use std::time::Duration;

use confhub::fingerprint;
use confhub::PollResolution;
use confhub::PublishMeta;

use crate::commons::hub;
use crate::commons::key;
use crate::commons::long_poll;
use crate::commons::wait_for_holds;

#[tokio::test(start_paused = true)]
async fn publish_wakes_parked_poll() {
    let hub = hub();
    let k = key("app.properties");
    let v1 = hub.publish(&k, "v1", PublishMeta::default()).unwrap().fingerprint;

    let poller = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.6");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    wait_for_holds(&hub, 1).await;

    hub.publish(&k, "v2", PublishMeta::default()).unwrap();

    let response = poller.await.unwrap().unwrap();
    assert_eq!(response.changed_keys, vec![k.clone()]);
    assert_eq!(response.resolution, PollResolution::Changed);

    // a client already on v2 is held until the timeout and gets nothing
    let v2 = fingerprint(b"v2");
    let started = tokio::time::Instant::now();
    let response = hub
        .long_poll(long_poll(&[(&k, v2.as_str())], "10.0.0.6"))
        .await
        .unwrap();
    assert!(response.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(29_500));
}

#[tokio::test(start_paused = true)]
async fn republishing_identical_content_does_not_wake() {
    let hub = hub();
    let k = key("app.properties");
    let v1 = hub.publish(&k, "v1", PublishMeta::default()).unwrap().fingerprint;

    let poller = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.6");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    wait_for_holds(&hub, 1).await;

    hub.publish(&k, "v1", PublishMeta::default()).unwrap();
    tokio::task::yield_now().await;
    assert!(!poller.is_finished());

    let response = poller.await.unwrap().unwrap();
    assert_eq!(response.resolution, PollResolution::Timeout);
}

#[tokio::test(start_paused = true)]
async fn gray_publish_wakes_only_selected_clients() {
    let hub = hub();
    let k = key("app.properties");
    let v1 = hub.publish(&k, "v1", PublishMeta::default()).unwrap().fingerprint;

    let beta_client = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.5");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    let plain_client = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.6");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    wait_for_holds(&hub, 2).await;

    hub.publish_gray(&k, "beta", "10.0.0.5", None, "v1-beta", PublishMeta::default())
        .unwrap();

    let response = beta_client.await.unwrap().unwrap();
    assert_eq!(response.changed_keys, vec![k.clone()]);
    assert_eq!(hub.coordinator().hold_count(), 1);

    hub.shutdown();
    let response = plain_client.await.unwrap().unwrap();
    assert_eq!(response.resolution, PollResolution::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn widening_a_gray_rule_wakes_newly_covered_clients() {
    let hub = hub();
    let k = key("app.properties");
    let v1 = hub.publish(&k, "v1", PublishMeta::default()).unwrap().fingerprint;
    hub.publish_gray(&k, "beta", "10.0.0.5", None, "v1-beta", PublishMeta::default())
        .unwrap();

    let poller = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.6");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    wait_for_holds(&hub, 1).await;

    // same gray content, wider IP list
    let started = tokio::time::Instant::now();
    let receipt = hub
        .publish_gray(&k, "beta", "10.0.0.5,10.0.0.6", None, "v1-beta", PublishMeta::default())
        .unwrap();
    assert!(receipt.changed);

    let response = poller.await.unwrap().unwrap();
    assert_eq!(response.resolution, PollResolution::Changed);
    assert_eq!(response.changed_keys, vec![k.clone()]);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(hub.coordinator().hold_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn removal_wakes_pollers_of_the_key() {
    let hub = hub();
    let k = key("app.properties");
    let v1 = hub.publish(&k, "v1", PublishMeta::default()).unwrap().fingerprint;

    let poller = {
        let hub = hub.clone();
        let request = long_poll(&[(&k, v1.as_str())], "10.0.0.6");
        tokio::spawn(async move { hub.long_poll(request).await })
    };
    wait_for_holds(&hub, 1).await;

    hub.remove(&k, PublishMeta::default()).unwrap();

    let response = poller.await.unwrap().unwrap();
    assert_eq!(response.changed_keys, vec![k]);
}
