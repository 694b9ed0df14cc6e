//! Prometheus metrics for the writer service
//!
//! - `kafka_publish_total{outcome}` - publish attempts by outcome
//! - `kafka_publish_duration_seconds` - time spent in a publish attempt
//! - `http_handler_panics_total` - panics caught by the fault barrier

use crate::publish::PublishOutcome;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics registry shared by all handlers
pub type SharedMetrics = Arc<Metrics>;

pub struct Metrics {
    registry: Registry,
    publish_total: IntCounterVec,
    publish_duration: Histogram,
    handler_panics: IntCounter,
}

/// Create and register all service metrics
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    let registry = Registry::new();

    let publish_total = IntCounterVec::new(
        Opts::new("kafka_publish_total", "Kafka publish attempts by outcome"),
        &["outcome"],
    )?;
    registry.register(Box::new(publish_total.clone()))?;

    let publish_duration = Histogram::with_opts(
        HistogramOpts::new(
            "kafka_publish_duration_seconds",
            "Time spent publishing one message, including connection setup",
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )?;
    registry.register(Box::new(publish_duration.clone()))?;

    let handler_panics = IntCounter::new(
        "http_handler_panics_total",
        "Handler panics converted into 500 responses",
    )?;
    registry.register(Box::new(handler_panics.clone()))?;

    Ok(Arc::new(Metrics {
        registry,
        publish_total,
        publish_duration,
        handler_panics,
    }))
}

impl Metrics {
    pub fn record_publish(&self, outcome: &PublishOutcome, seconds: f64) {
        self.publish_total
            .with_label_values(&[outcome.label()])
            .inc();
        self.publish_duration.observe(seconds);
    }

    pub fn record_panic(&self) {
        self.handler_panics.inc();
    }

    pub fn publish_count(&self, outcome: &str) -> u64 {
        self.publish_total.with_label_values(&[outcome]).get()
    }

    pub fn panic_count(&self) -> u64 {
        self.handler_panics.get()
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
