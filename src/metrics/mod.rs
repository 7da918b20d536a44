use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tracing::warn;

lazy_static! {
    pub static ref RESOLVE_OUTCOME_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("config_resolve_outcomes", "Config query resolutions by outcome status"),
        &["status"]
    )
    .expect("metric can not be created");

    pub static ref HELD_POLLS_GAUGE: IntGauge =
        IntGauge::new("config_held_polls", "Long poll requests currently parked")
            .expect("metric can not be created");

    pub static ref POLL_RESOLUTION_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("config_poll_resolutions", "Poll requests by the way they completed"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref FUZZY_PATTERN_GAUGE: IntGauge =
        IntGauge::new("config_fuzzy_patterns", "Active fuzzy watch patterns")
            .expect("metric can not be created");

    pub static ref PUBLISH_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("config_publishes", "Config mutations by history op type"),
        &["op_type"]
    )
    .expect("Should succeed to create metric");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry
            .register(Box::new(RESOLVE_OUTCOME_COUNTER.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(HELD_POLLS_GAUGE.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(POLL_RESOLUTION_COUNTER.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(FUZZY_PATTERN_GAUGE.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(PUBLISH_COUNTER.clone()))
            .expect("collector can be registered");
        registry
    };
}

/// Export metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

#[cfg(test)]
mod metrics_test;
