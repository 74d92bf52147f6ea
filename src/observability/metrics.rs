use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Credential exchange
    pub exchange_requests: IntCounterVec,
    pub exchange_duration: HistogramVec,

    // Proxied upstream calls
    pub upstream_requests: IntCounterVec,
    pub upstream_duration: HistogramVec,
    pub token_refreshes: IntCounterVec,

    // Credential store
    pub store_writes: IntCounterVec,
    pub store_failures: IntCounterVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("osuproxy".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            exchange_requests: IntCounterVec::new(Opts::new("exchange_requests_total", "Client-credentials exchanges by outcome"), &["outcome"]).unwrap(),
            exchange_duration: HistogramVec::new(HistogramOpts::new("exchange_duration_seconds", "Client-credentials exchange duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["outcome"]).unwrap(),

            upstream_requests: IntCounterVec::new(Opts::new("upstream_requests_total", "Authenticated upstream calls by endpoint and status"), &["endpoint", "status"]).unwrap(),
            upstream_duration: HistogramVec::new(HistogramOpts::new("upstream_duration_seconds", "Authenticated upstream call duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]), &["endpoint"]).unwrap(),
            token_refreshes: IntCounterVec::new(Opts::new("token_refreshes_total", "Re-acquisitions triggered by a missing or rejected token"), &["trigger"]).unwrap(),

            store_writes: IntCounterVec::new(Opts::new("store_writes_total", "Credential store writes"), &["store"]).unwrap(),
            store_failures: IntCounterVec::new(Opts::new("store_failures_total", "Credential store write failures"), &["store"]).unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").unwrap(),
            up: IntGauge::new("up", "1 if service is serving").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.exchange_requests.clone())).unwrap();
        reg.register(Box::new(metrics.exchange_duration.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.upstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.store_writes.clone())).unwrap();
        reg.register(Box::new(metrics.store_failures.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
