use super::*;

#[test]
fn test_gather_contains_registered_metrics() {
    PUBLISH_COUNTER.with_label_values(&["I"]).inc();
    RESOLVE_OUTCOME_COUNTER.with_label_values(&["resolved"]).inc();

    let body = gather_metrics();

    assert!(body.contains("config_publishes"), "Missing config_publishes");
    assert!(body.contains("config_resolve_outcomes"));
    assert!(body.contains("config_held_polls"));
}

// Test the correctness of the indicator update logic
#[test]
fn test_counter_increment() {
    let before = POLL_RESOLUTION_COUNTER.with_label_values(&["test"]).get();

    POLL_RESOLUTION_COUNTER.with_label_values(&["test"]).inc();
    POLL_RESOLUTION_COUNTER.with_label_values(&["test"]).inc();

    assert_eq!(POLL_RESOLUTION_COUNTER.with_label_values(&["test"]).get(), before + 2);
}
